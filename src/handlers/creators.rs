//! Handlers that create records

use hyper::StatusCode;
use tracing::{info, warn};

use super::{
    default_error_response, when_conflict, when_missing, Endpoint, EndpointResponse,
    ServiceRegistry,
};
use crate::auth::hash_password;
use crate::models::{
    CommentRequest, ConceptLinkRecord, ConceptSimpleView, CreateConcept, CredentialSet,
    EndpointInformationalMessage, EstablishLink, FollowRequest, LikeRequest,
};
use crate::services::{
    AccountsDataService, ConceptsDataService, EngagementDataService, RegisteredService,
};
use crate::types::{IdeaBankError, Result};

/// Conflicts become 403 and rejected input 400; the rest use the base mapping
fn creation_error<B>(err: IdeaBankError) -> EndpointResponse<B> {
    match err {
        IdeaBankError::AlreadyExists(_) => EndpointResponse::failure(StatusCode::FORBIDDEN, &err),
        IdeaBankError::InvalidInput(_) => EndpointResponse::failure(StatusCode::BAD_REQUEST, &err),
        other => default_error_response(other),
    }
}

fn created(message: String) -> EndpointResponse<EndpointInformationalMessage> {
    EndpointResponse::success(
        StatusCode::CREATED,
        EndpointInformationalMessage::new(message),
    )
}

/// Registers a new account
pub struct AccountCreationHandler;

impl AccountCreationHandler {
    fn validate(request: &CredentialSet) -> Result<()> {
        let name = request.display_name.trim();
        if name.is_empty() || name != request.display_name || name.contains('/') {
            return Err(IdeaBankError::InvalidInput(
                "Display name must be non-empty, untrimmed and free of '/'".into(),
            ));
        }
        if request.password.is_empty() {
            return Err(IdeaBankError::InvalidInput("Password must not be empty".into()));
        }
        Ok(())
    }
}

impl Endpoint for AccountCreationHandler {
    type Request = CredentialSet;
    type Output = String;
    type Body = EndpointInformationalMessage;

    fn do_data_ops(&mut self, services: &ServiceRegistry, request: CredentialSet) -> Result<String> {
        Self::validate(&request)?;
        info!("Creating account: {}", request.display_name);
        let service = services.get(RegisteredService::AccountsDs)?;
        let (password_hash, salt_value) = hash_password(&request.password)?;

        service
            .within_scope(|scope| {
                scope.add_query(AccountsDataService::create_account(
                    &request.display_name,
                    &password_hash,
                    &salt_value,
                ));
                scope.exec_next()?;
                scope.results()?.one()?.get::<String>("display_name")
            })
            .map_err(when_conflict(format!(
                "Display name {} is already taken",
                request.display_name
            )))
    }

    fn build_success(&self, output: String) -> EndpointResponse<EndpointInformationalMessage> {
        created(format!("{} account created", output))
    }

    fn build_error(&self, err: IdeaBankError) -> EndpointResponse<EndpointInformationalMessage> {
        creation_error(err)
    }
}

/// Publishes a concept and hands back where to upload its thumbnail
pub struct ConceptCreationHandler;

impl Endpoint for ConceptCreationHandler {
    type Request = CreateConcept;
    type Output = ConceptSimpleView;
    type Body = ConceptSimpleView;

    fn do_data_ops(
        &mut self,
        services: &ServiceRegistry,
        request: CreateConcept,
    ) -> Result<ConceptSimpleView> {
        let concept = request.concept;
        concept.validate()?;
        let proposed = format!("{}/{}", concept.author, concept.title);
        info!("Creating concept: {}", proposed);
        let service = services.get(RegisteredService::ConceptsDs)?;

        service
            .within_scope(|scope| {
                scope.add_query(ConceptsDataService::create_concept(
                    &concept.title,
                    &concept.author,
                    &concept.description,
                    &concept.diagram,
                ));
                scope.exec_next()?;
                let identifier: String = scope.results()?.one()?.get("identifier")?;
                Ok(ConceptSimpleView {
                    thumbnail_url: service.put_item(&format!("thumbnails/{identifier}"))?,
                    identifier,
                })
            })
            .map_err(when_conflict(format!(
                "Concept {} already exists or its author is unknown",
                proposed
            )))
    }

    fn build_success(&self, output: ConceptSimpleView) -> EndpointResponse<ConceptSimpleView> {
        EndpointResponse::success(StatusCode::CREATED, output)
    }

    fn build_error(&self, err: IdeaBankError) -> EndpointResponse<ConceptSimpleView> {
        creation_error(err)
    }
}

/// Records that one concept builds on another
pub struct ConceptLinkingHandler;

impl Endpoint for ConceptLinkingHandler {
    type Request = EstablishLink;
    type Output = ConceptLinkRecord;
    type Body = ConceptLinkRecord;

    fn do_data_ops(
        &mut self,
        services: &ServiceRegistry,
        request: EstablishLink,
    ) -> Result<ConceptLinkRecord> {
        let ConceptLinkRecord {
            ancestor,
            descendant,
        } = request.link;
        info!("Linking {} -> {}", ancestor, descendant);
        if ancestor == descendant {
            return Err(IdeaBankError::AlreadyExists(format!(
                "{} cannot build on itself",
                ancestor
            )));
        }
        let service = services.get(RegisteredService::ConceptsDs)?;

        service
            .within_scope(|scope| {
                scope.add_query(ConceptsDataService::would_create_cycle(&ancestor, &descendant));
                scope.add_query(ConceptsDataService::link_existing_concept(&ancestor, &descendant));

                scope.exec_next()?;
                let hits: i64 = scope.results()?.one()?.get("hits")?;
                if hits > 0 {
                    warn!("Link {} -> {} would close a cycle", ancestor, descendant);
                    return Err(IdeaBankError::AlreadyExists(format!(
                        "{} already descends from {}",
                        ancestor, descendant
                    )));
                }

                scope.exec_next()?;
                let link = scope.results()?.one()?;
                Ok(ConceptLinkRecord {
                    ancestor: link.get("ancestor")?,
                    descendant: link.get("descendant")?,
                })
            })
            .map_err(when_conflict(format!(
                "Cannot link {} -> {}: the link exists or a concept is unknown",
                ancestor, descendant
            )))
    }

    fn build_success(&self, output: ConceptLinkRecord) -> EndpointResponse<ConceptLinkRecord> {
        EndpointResponse::success(StatusCode::CREATED, output)
    }

    fn build_error(&self, err: IdeaBankError) -> EndpointResponse<ConceptLinkRecord> {
        creation_error(err)
    }
}

/// Starts one account following another
pub struct FollowAccountHandler;

impl Endpoint for FollowAccountHandler {
    type Request = FollowRequest;
    type Output = FollowRequest;
    type Body = EndpointInformationalMessage;

    fn do_data_ops(
        &mut self,
        services: &ServiceRegistry,
        request: FollowRequest,
    ) -> Result<FollowRequest> {
        info!("Adding following record {} <- {}", request.followee, request.follower);
        let service = services.get(RegisteredService::EngageDs)?;

        service
            .within_scope(|scope| {
                scope.add_query(EngagementDataService::start_following(
                    &request.follower,
                    &request.followee,
                ));
                scope.exec_next()
            })
            .map_err(when_conflict(format!(
                "{} cannot follow {}",
                request.follower, request.followee
            )))?;
        Ok(request)
    }

    fn build_success(&self, output: FollowRequest) -> EndpointResponse<EndpointInformationalMessage> {
        created(format!("{} is now following {}", output.follower, output.followee))
    }

    fn build_error(&self, err: IdeaBankError) -> EndpointResponse<EndpointInformationalMessage> {
        creation_error(err)
    }
}

/// Records that an account likes a concept
pub struct LikeConceptHandler;

impl Endpoint for LikeConceptHandler {
    type Request = LikeRequest;
    type Output = LikeRequest;
    type Body = EndpointInformationalMessage;

    fn do_data_ops(&mut self, services: &ServiceRegistry, request: LikeRequest) -> Result<LikeRequest> {
        info!(
            "Adding liking record {} <- {}",
            request.concept_liked, request.user_liking
        );
        let service = services.get(RegisteredService::EngageDs)?;

        service
            .within_scope(|scope| {
                scope.add_query(EngagementDataService::start_liking(
                    &request.user_liking,
                    &request.concept_liked,
                ));
                scope.exec_next()
            })
            .map_err(when_conflict(format!(
                "{} cannot like {}",
                request.user_liking, request.concept_liked
            )))?;
        Ok(request)
    }

    fn build_success(&self, output: LikeRequest) -> EndpointResponse<EndpointInformationalMessage> {
        created(format!("{} now likes {}", output.user_liking, output.concept_liked))
    }

    fn build_error(&self, err: IdeaBankError) -> EndpointResponse<EndpointInformationalMessage> {
        creation_error(err)
    }
}

/// Posts a comment on a concept, or a reply to an earlier comment
pub struct ConceptCommentingHandler;

impl Endpoint for ConceptCommentingHandler {
    type Request = CommentRequest;
    type Output = (i64, String);
    type Body = EndpointInformationalMessage;

    fn do_data_ops(
        &mut self,
        services: &ServiceRegistry,
        request: CommentRequest,
    ) -> Result<(i64, String)> {
        if request.free_text.trim().is_empty() {
            return Err(IdeaBankError::InvalidInput("Comment text must not be empty".into()));
        }
        info!("{} is commenting on {}", request.comment_by, request.concept_id);
        let service = services.get(RegisteredService::EngageDs)?;

        let comment_id = service
            .within_scope(|scope| {
                scope.add_query(EngagementDataService::comment_on(
                    &request.concept_id,
                    &request.comment_by,
                    &request.free_text,
                    request.response_to,
                ));
                scope.exec_next()?;
                scope
                    .results()?
                    .one()
                    .map_err(when_missing(|| {
                        IdeaBankError::AlreadyExists(format!(
                            "Reply target is not a comment on {}",
                            request.concept_id
                        ))
                    }))?
                    .get::<i64>("comment_id")
            })
            .map_err(when_conflict(format!(
                "Cannot comment on {}: the concept or the comment replied to is unknown",
                request.concept_id
            )))?;
        Ok((comment_id, request.concept_id))
    }

    fn build_success(&self, output: (i64, String)) -> EndpointResponse<EndpointInformationalMessage> {
        let (comment_id, concept_id) = output;
        created(format!("Comment {} posted on {}", comment_id, concept_id))
    }

    fn build_error(&self, err: IdeaBankError) -> EndpointResponse<EndpointInformationalMessage> {
        creation_error(err)
    }
}
