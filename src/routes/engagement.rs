//! Follow and like routes
//!
//! - POST   /follows                           - start following (token required)
//! - DELETE /follows                           - stop following (token required)
//! - GET    /follows/{follower}/{followee}     - check
//! - POST   /likes                             - like a concept (token required)
//! - DELETE /likes                             - stop liking (token required)
//! - GET    /likes/{user}/{author}/{title}     - check

use hyper::body::Incoming;
use hyper::{Request, Response};
use std::sync::Arc;

use super::{authorization, bearer_token, dispatch, error_response, read_json, Access, BoxBody};
use crate::handlers::{
    CheckFollowingStatusHandler, CheckLikingStatusHandler, FollowAccountHandler,
    LikeConceptHandler, StopFollowingAccountHandler, StopLikingConceptHandler,
};
use crate::models::{
    AccountFollowingRecord, ConceptLikingRecord, FollowRequest, LikeRequest,
    UnfollowRequest, UnlikeRequest,
};
use crate::server::AppState;
use crate::services::RegisteredService;

const ENGAGEMENT: &[RegisteredService] = &[RegisteredService::EngageDs];

pub async fn follow(state: Arc<AppState>, req: Request<Incoming>) -> Response<BoxBody> {
    let token = bearer_token(&req);
    let record: AccountFollowingRecord = match read_json(req).await {
        Ok(r) => r,
        Err(e) => return error_response(&e),
    };
    let request = FollowRequest {
        auth_token: authorization(token, &record.follower),
        follower: record.follower,
        followee: record.followee,
    };
    dispatch(state, FollowAccountHandler, Access::Gated, ENGAGEMENT, request).await
}

pub async fn unfollow(state: Arc<AppState>, req: Request<Incoming>) -> Response<BoxBody> {
    let token = bearer_token(&req);
    let record: AccountFollowingRecord = match read_json(req).await {
        Ok(r) => r,
        Err(e) => return error_response(&e),
    };
    let request = UnfollowRequest {
        auth_token: authorization(token, &record.follower),
        follower: record.follower,
        followee: record.followee,
    };
    dispatch(state, StopFollowingAccountHandler, Access::Gated, ENGAGEMENT, request).await
}

pub async fn check_following(
    state: Arc<AppState>,
    follower: &str,
    followee: &str,
) -> Response<BoxBody> {
    let record = AccountFollowingRecord {
        follower: follower.to_string(),
        followee: followee.to_string(),
    };
    dispatch(state, CheckFollowingStatusHandler, Access::Open, ENGAGEMENT, record).await
}

pub async fn like(state: Arc<AppState>, req: Request<Incoming>) -> Response<BoxBody> {
    let token = bearer_token(&req);
    let record: ConceptLikingRecord = match read_json(req).await {
        Ok(r) => r,
        Err(e) => return error_response(&e),
    };
    let request = LikeRequest {
        auth_token: authorization(token, &record.user_liking),
        user_liking: record.user_liking,
        concept_liked: record.concept_liked,
    };
    dispatch(state, LikeConceptHandler, Access::Gated, ENGAGEMENT, request).await
}

pub async fn unlike(state: Arc<AppState>, req: Request<Incoming>) -> Response<BoxBody> {
    let token = bearer_token(&req);
    let record: ConceptLikingRecord = match read_json(req).await {
        Ok(r) => r,
        Err(e) => return error_response(&e),
    };
    let request = UnlikeRequest {
        auth_token: authorization(token, &record.user_liking),
        user_liking: record.user_liking,
        concept_liked: record.concept_liked,
    };
    dispatch(state, StopLikingConceptHandler, Access::Gated, ENGAGEMENT, request).await
}

pub async fn check_liking(
    state: Arc<AppState>,
    user: &str,
    author: &str,
    title: &str,
) -> Response<BoxBody> {
    let record = ConceptLikingRecord {
        user_liking: user.to_string(),
        concept_liked: format!("{author}/{title}"),
    };
    dispatch(state, CheckLikingStatusHandler, Access::Open, ENGAGEMENT, record).await
}
