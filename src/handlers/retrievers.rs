//! Handlers that read data

use std::sync::Arc;

use hyper::StatusCode;
use tracing::{debug, info, warn};

use super::lineage::LineageBuilder;
use super::{map_error, when_missing, Endpoint, EndpointResponse, ServiceRegistry};
use crate::auth::{verify_password, JwtValidator};
use crate::db::QueryScope;
use crate::models::{
    AccountFollowingRecord, AuthorizationToken, ConceptComment, ConceptCommentThreads,
    ConceptFullView, ConceptLikingRecord, ConceptLineage, ConceptRequest, ConceptSearchQuery,
    ConceptSimpleView, ConceptView, CredentialSet, EndpointInformationalMessage, ProfileView,
};
use crate::services::{
    AccountsDataService, ConceptsDataService, EngagementDataService, RegisteredService,
};
use crate::types::{IdeaBankError, Result};

const INVALID_CREDENTIALS: &str = "Invalid display name or password";

fn is_not_found(err: &IdeaBankError) -> bool {
    matches!(err, IdeaBankError::RequestedDataNotFound(_))
}

/// Exchanges a display name and password for a signed token
pub struct AuthenticationHandler {
    signer: Arc<JwtValidator>,
}

impl AuthenticationHandler {
    pub fn new(signer: Arc<JwtValidator>) -> Self {
        Self { signer }
    }
}

impl Endpoint for AuthenticationHandler {
    type Request = CredentialSet;
    type Output = AuthorizationToken;
    type Body = AuthorizationToken;

    fn do_data_ops(
        &mut self,
        services: &ServiceRegistry,
        request: CredentialSet,
    ) -> Result<AuthorizationToken> {
        info!("Looking up account information: {}", request.display_name);
        let service = services.get(RegisteredService::AccountsDs)?;

        let display_name = service.within_scope(|scope| {
            scope.add_query(AccountsDataService::fetch_authentication_information(
                &request.display_name,
            ));
            scope.exec_next()?;
            let record = scope.results()?.one().map_err(when_missing(|| {
                warn!("No account record found: {}", request.display_name);
                IdeaBankError::InvalidCredentials(INVALID_CREDENTIALS.into())
            }))?;

            let stored: String = record.get("password_hash")?;
            let matches = verify_password(&request.password, &stored).unwrap_or_else(|e| {
                warn!("Stored password hash is unusable: {}", e);
                false
            });
            if !matches {
                debug!("Provided credentials did not match records");
                return Err(IdeaBankError::InvalidCredentials(INVALID_CREDENTIALS.into()));
            }
            record.get::<String>("display_name")
        })?;

        Ok(AuthorizationToken {
            token: self.signer.generate_token(&display_name)?,
            presenter: display_name,
        })
    }

    fn build_success(&self, output: AuthorizationToken) -> EndpointResponse<AuthorizationToken> {
        EndpointResponse::success(StatusCode::OK, output)
    }

    fn build_error(&self, err: IdeaBankError) -> EndpointResponse<AuthorizationToken> {
        map_error(
            err,
            |e| matches!(e, IdeaBankError::InvalidCredentials(_)),
            StatusCode::UNAUTHORIZED,
        )
    }
}

/// Public profile of an account, looked up by display name
pub struct ProfileRetrievalHandler;

impl Endpoint for ProfileRetrievalHandler {
    type Request = String;
    type Output = ProfileView;
    type Body = ProfileView;

    fn do_data_ops(&mut self, services: &ServiceRegistry, request: String) -> Result<ProfileView> {
        info!("Looking up profile information: {}", request);
        let service = services.get(RegisteredService::AccountsDs)?;

        service.within_scope(|scope| {
            scope.add_query(AccountsDataService::fetch_account_profile(&request));
            scope.exec_next()?;
            let profile = scope.results()?.one().map_err(when_missing(|| {
                IdeaBankError::RequestedDataNotFound(format!(
                    "Profile for {} is not available",
                    request
                ))
            }))?;

            Ok(ProfileView {
                preferred_name: profile.get("preferred_name")?,
                biography: profile.get("biography")?,
                avatar_url: service.share_item(&format!("avatars/{}", request))?,
            })
        })
    }

    fn build_success(&self, output: ProfileView) -> EndpointResponse<ProfileView> {
        EndpointResponse::success(StatusCode::OK, output)
    }

    fn build_error(&self, err: IdeaBankError) -> EndpointResponse<ProfileView> {
        map_error(err, is_not_found, StatusCode::NOT_FOUND)
    }
}

/// One concept by author and title, in full or simple form
pub struct SpecificConceptRetrievalHandler;

impl Endpoint for SpecificConceptRetrievalHandler {
    type Request = ConceptRequest;
    type Output = ConceptView;
    type Body = ConceptView;

    fn do_data_ops(
        &mut self,
        services: &ServiceRegistry,
        request: ConceptRequest,
    ) -> Result<ConceptView> {
        info!("Searching for specific concept: {}", request.identifier());
        let service = services.get(RegisteredService::ConceptsDs)?;

        service.within_scope(|scope| {
            scope.add_query(ConceptsDataService::find_exact_concept(
                &request.title,
                &request.author,
            ));
            scope.exec_next()?;
            let concept = scope.results()?.one().map_err(when_missing(|| {
                IdeaBankError::RequestedDataNotFound(format!(
                    "No match for `{}`",
                    request.identifier()
                ))
            }))?;

            let author: String = concept.get("author")?;
            let title: String = concept.get("title")?;
            let thumbnail_url = service.share_item(&format!("thumbnails/{author}/{title}"))?;

            if request.simple {
                return Ok(ConceptView::Simple(ConceptSimpleView {
                    identifier: format!("{author}/{title}"),
                    thumbnail_url,
                }));
            }
            let diagram: String = concept.get("diagram")?;
            let diagram = serde_json::from_str(&diagram).map_err(|e| {
                IdeaBankError::Internal(format!("Stored diagram for {author}/{title} is unreadable: {e}"))
            })?;
            Ok(ConceptView::Full(ConceptFullView {
                description: concept.get("description")?,
                diagram,
                author,
                title,
                thumbnail_url,
            }))
        })
    }

    fn build_success(&self, output: ConceptView) -> EndpointResponse<ConceptView> {
        info!("Found a matching concept");
        EndpointResponse::success(StatusCode::OK, output)
    }

    fn build_error(&self, err: IdeaBankError) -> EndpointResponse<ConceptView> {
        map_error(err, is_not_found, StatusCode::NOT_FOUND)
    }
}

/// Concepts matching a search query, most recently updated first
pub struct ConceptSearchResultHandler;

impl Endpoint for ConceptSearchResultHandler {
    type Request = ConceptSearchQuery;
    type Output = Vec<ConceptSimpleView>;
    type Body = Vec<ConceptSimpleView>;

    fn do_data_ops(
        &mut self,
        services: &ServiceRegistry,
        request: ConceptSearchQuery,
    ) -> Result<Vec<ConceptSimpleView>> {
        info!(
            author = %request.author,
            title = %request.title,
            fuzzy = ?request.fuzzy,
            "Searching for concepts"
        );
        let service = services.get(RegisteredService::ConceptsDs)?;

        service.within_scope(|scope| {
            scope.add_query(ConceptsDataService::query_concepts(
                &request.title,
                &request.author,
                request.not_before,
                request.not_after,
                request.fuzzy,
            ));
            scope.exec_next()?;
            scope
                .results()?
                .all()
                .map(|row| -> Result<ConceptSimpleView> {
                    let identifier: String = row.get("identifier")?;
                    Ok(ConceptSimpleView {
                        thumbnail_url: service.share_item(&format!("thumbnails/{identifier}"))?,
                        identifier,
                    })
                })
                .collect()
        })
    }

    fn build_success(&self, output: Vec<ConceptSimpleView>) -> EndpointResponse<Vec<ConceptSimpleView>> {
        EndpointResponse::success(StatusCode::OK, output)
    }
}

/// The lineage tree around one concept
pub struct ConceptLineageHandler;

impl Endpoint for ConceptLineageHandler {
    type Request = ConceptRequest;
    type Output = ConceptLineage;
    type Body = ConceptLineage;

    fn do_data_ops(
        &mut self,
        services: &ServiceRegistry,
        request: ConceptRequest,
    ) -> Result<ConceptLineage> {
        let focus = request.identifier();
        info!("Building lineage for `{}`", focus);
        let service = services.get(RegisteredService::ConceptsDs)?;

        let tree = service.within_scope(|scope| {
            scope.add_query(ConceptsDataService::find_exact_concept(
                &request.title,
                &request.author,
            ));
            scope.exec_next()?;
            scope.results()?.one().map_err(when_missing(|| {
                warn!("No concept record found for `{}`. Unable to build lineage", focus);
                IdeaBankError::RequestedDataNotFound(format!(
                    "Could not build the lineage for {}",
                    focus
                ))
            }))?;

            LineageBuilder::new(service).build(scope, &focus)
        })?;

        Ok(ConceptLineage {
            nodes: tree.size(),
            lineage: tree.to_value(),
        })
    }

    fn build_success(&self, output: ConceptLineage) -> EndpointResponse<ConceptLineage> {
        info!("Lineage successfully obtained");
        EndpointResponse::success(StatusCode::OK, output)
    }

    fn build_error(&self, err: IdeaBankError) -> EndpointResponse<ConceptLineage> {
        map_error(err, is_not_found, StatusCode::NOT_FOUND)
    }
}

/// Whether one account follows another
pub struct CheckFollowingStatusHandler;

impl Endpoint for CheckFollowingStatusHandler {
    type Request = AccountFollowingRecord;
    type Output = EndpointInformationalMessage;
    type Body = EndpointInformationalMessage;

    fn do_data_ops(
        &mut self,
        services: &ServiceRegistry,
        request: AccountFollowingRecord,
    ) -> Result<EndpointInformationalMessage> {
        info!("Checking if {} follows {}", request.follower, request.followee);
        let service = services.get(RegisteredService::EngageDs)?;

        service.within_scope(|scope| {
            scope.add_query(EngagementDataService::check_following(
                &request.follower,
                &request.followee,
            ));
            scope.exec_next()?;
            scope.results()?.one().map_err(when_missing(|| {
                IdeaBankError::RequestedDataNotFound(format!(
                    "{} is not following {}",
                    request.follower, request.followee
                ))
            }))?;
            Ok(EndpointInformationalMessage::new(format!(
                "{} is following {}",
                request.follower, request.followee
            )))
        })
    }

    fn build_success(
        &self,
        output: EndpointInformationalMessage,
    ) -> EndpointResponse<EndpointInformationalMessage> {
        EndpointResponse::success(StatusCode::OK, output)
    }

    fn build_error(&self, err: IdeaBankError) -> EndpointResponse<EndpointInformationalMessage> {
        map_error(err, is_not_found, StatusCode::NOT_FOUND)
    }
}

/// Whether an account likes a concept
pub struct CheckLikingStatusHandler;

impl Endpoint for CheckLikingStatusHandler {
    type Request = ConceptLikingRecord;
    type Output = EndpointInformationalMessage;
    type Body = EndpointInformationalMessage;

    fn do_data_ops(
        &mut self,
        services: &ServiceRegistry,
        request: ConceptLikingRecord,
    ) -> Result<EndpointInformationalMessage> {
        info!("Checking if {} likes {}", request.user_liking, request.concept_liked);
        let service = services.get(RegisteredService::EngageDs)?;

        service.within_scope(|scope| {
            scope.add_query(EngagementDataService::check_liking(
                &request.user_liking,
                &request.concept_liked,
            ));
            scope.exec_next()?;
            scope.results()?.one().map_err(when_missing(|| {
                IdeaBankError::RequestedDataNotFound(format!(
                    "{} does not like {}",
                    request.user_liking, request.concept_liked
                ))
            }))?;
            Ok(EndpointInformationalMessage::new(format!(
                "{} does like {}",
                request.user_liking, request.concept_liked
            )))
        })
    }

    fn build_success(
        &self,
        output: EndpointInformationalMessage,
    ) -> EndpointResponse<EndpointInformationalMessage> {
        EndpointResponse::success(StatusCode::OK, output)
    }

    fn build_error(&self, err: IdeaBankError) -> EndpointResponse<EndpointInformationalMessage> {
        map_error(err, is_not_found, StatusCode::NOT_FOUND)
    }
}

/// Every comment thread on a concept, replies nested under what they answer
pub struct ConceptCommentsSectionHandler;

impl ConceptCommentsSectionHandler {
    fn replies(
        scope: &mut QueryScope,
        concept_id: &str,
        response_to: Option<i64>,
    ) -> Result<Vec<ConceptComment>> {
        scope.add_query(EngagementDataService::comments_on(concept_id, response_to));
        scope.exec_next()?;
        let mut comments = scope
            .results()?
            .all()
            .map(|row| -> Result<ConceptComment> {
                Ok(ConceptComment {
                    comment_id: row.get("comment_id")?,
                    comment_author: row.get("comment_by")?,
                    comment_text: row.get("free_text")?,
                    responses: Vec::new(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        for comment in &mut comments {
            comment.responses = Self::replies(scope, concept_id, Some(comment.comment_id))?;
        }
        Ok(comments)
    }
}

impl Endpoint for ConceptCommentsSectionHandler {
    type Request = ConceptRequest;
    type Output = ConceptCommentThreads;
    type Body = ConceptCommentThreads;

    fn do_data_ops(
        &mut self,
        services: &ServiceRegistry,
        request: ConceptRequest,
    ) -> Result<ConceptCommentThreads> {
        let concept_id = request.identifier();
        info!("Gathering comments on {}", concept_id);
        let service = services.get(RegisteredService::EngageDs)?;

        let threads = service.within_scope(|scope| Self::replies(scope, &concept_id, None))?;
        Ok(ConceptCommentThreads { threads })
    }

    fn build_success(&self, output: ConceptCommentThreads) -> EndpointResponse<ConceptCommentThreads> {
        EndpointResponse::success(StatusCode::OK, output)
    }
}
