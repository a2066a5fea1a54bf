//! Handlers that remove records

use hyper::StatusCode;
use tracing::info;

use super::{Endpoint, EndpointResponse, ServiceRegistry};
use crate::models::{EndpointInformationalMessage, UnfollowRequest, UnlikeRequest};
use crate::services::{EngagementDataService, RegisteredService};
use crate::types::Result;

/// Removes a following record
pub struct StopFollowingAccountHandler;

impl Endpoint for StopFollowingAccountHandler {
    type Request = UnfollowRequest;
    type Output = EndpointInformationalMessage;
    type Body = EndpointInformationalMessage;

    fn do_data_ops(
        &mut self,
        services: &ServiceRegistry,
        request: UnfollowRequest,
    ) -> Result<EndpointInformationalMessage> {
        info!(
            "Removing the following record {} <- {}",
            request.followee, request.follower
        );
        services
            .get(RegisteredService::EngageDs)?
            .within_scope(|scope| {
                scope.add_query(EngagementDataService::revoke_following(
                    &request.follower,
                    &request.followee,
                ));
                scope.exec_next()
            })?;

        Ok(EndpointInformationalMessage::new(format!(
            "{} is no longer following {}",
            request.follower, request.followee
        )))
    }

    fn build_success(
        &self,
        output: EndpointInformationalMessage,
    ) -> EndpointResponse<EndpointInformationalMessage> {
        EndpointResponse::success(StatusCode::OK, output)
    }
}

/// Removes a liking record
pub struct StopLikingConceptHandler;

impl Endpoint for StopLikingConceptHandler {
    type Request = UnlikeRequest;
    type Output = EndpointInformationalMessage;
    type Body = EndpointInformationalMessage;

    fn do_data_ops(
        &mut self,
        services: &ServiceRegistry,
        request: UnlikeRequest,
    ) -> Result<EndpointInformationalMessage> {
        info!(
            "Removing the liking record {} <- {}",
            request.concept_liked, request.user_liking
        );
        services
            .get(RegisteredService::EngageDs)?
            .within_scope(|scope| {
                scope.add_query(EngagementDataService::revoke_liking(
                    &request.user_liking,
                    &request.concept_liked,
                ));
                scope.exec_next()
            })?;

        Ok(EndpointInformationalMessage::new(format!(
            "{} no longer likes {}",
            request.user_liking, request.concept_liked
        )))
    }

    fn build_success(
        &self,
        output: EndpointInformationalMessage,
    ) -> EndpointResponse<EndpointInformationalMessage> {
        EndpointResponse::success(StatusCode::OK, output)
    }
}
