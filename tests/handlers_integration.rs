//! Integration tests for endpoint handlers against an on-disk SQLite store
//!
//! Each test builds its own database in a temporary directory and drives
//! handlers the same way the route layer does.

use chrono::{Duration, Utc};
use hyper::StatusCode;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

use ideabank::auth::{AuthorizationGate, JwtValidator};
use ideabank::db::{Database, Statement};
use ideabank::handlers::*;
use ideabank::models::*;
use ideabank::services::{RegisteredService, ServiceProvider, SignedLinkProvider};
use ideabank::IdeaBankError;

struct Harness {
    _temp: TempDir,
    db: Database,
    provider: ServiceProvider,
    signer: Arc<JwtValidator>,
}

fn harness() -> Harness {
    let temp = TempDir::new().unwrap();
    let db = Database::open(&temp.path().join("ideabank.db"), 4).unwrap();
    let links = Arc::new(SignedLinkProvider::new("http://objects.test/ideabank", "link-secret", 300).unwrap());
    let provider = ServiceProvider::new(db.sessions().shared(), links);
    let signer = Arc::new(
        JwtValidator::new("integration-secret-at-least-32-characters".into(), 3600).unwrap(),
    );
    Harness {
        _temp: temp,
        db,
        provider,
        signer,
    }
}

impl Harness {
    fn serve<E: Endpoint>(&self, endpoint: E, gated: bool, request: E::Request) -> EndpointResponse<E::Body> {
        let mut handler = if gated {
            EndpointHandler::gated(endpoint, AuthorizationGate::new(Arc::clone(&self.signer)))
        } else {
            EndpointHandler::new(endpoint)
        };
        for name in [
            RegisteredService::AccountsDs,
            RegisteredService::ConceptsDs,
            RegisteredService::EngageDs,
        ] {
            handler.use_service(name, self.provider.clone());
        }
        handler.receive(request).unwrap();
        handler.into_result().unwrap()
    }

    fn create_account(&self, name: &str, password: &str) -> EndpointResponse<EndpointInformationalMessage> {
        self.serve(
            AccountCreationHandler,
            false,
            CredentialSet {
                display_name: name.into(),
                password: password.into(),
            },
        )
    }

    fn login(&self, name: &str, password: &str) -> EndpointResponse<AuthorizationToken> {
        self.serve(
            AuthenticationHandler::new(Arc::clone(&self.signer)),
            false,
            CredentialSet {
                display_name: name.into(),
                password: password.into(),
            },
        )
    }

    /// Account plus a token presented by its owner
    fn member(&self, name: &str) -> AuthorizationToken {
        assert_eq!(self.create_account(name, "hunter22").code, StatusCode::CREATED);
        self.login(name, "hunter22").payload().unwrap().clone()
    }

    fn create_concept(
        &self,
        token: &AuthorizationToken,
        author: &str,
        title: &str,
    ) -> EndpointResponse<ConceptSimpleView> {
        self.serve(
            ConceptCreationHandler,
            true,
            CreateConcept {
                auth_token: Some(AuthorizationToken {
                    token: token.token.clone(),
                    presenter: author.into(),
                }),
                concept: ConceptDataPayload {
                    author: author.into(),
                    title: title.into(),
                    description: format!("About {title}"),
                    diagram: json!({"nodes": [{"id": 1, "label": title}]}),
                },
            },
        )
    }

    fn link(
        &self,
        token: &AuthorizationToken,
        ancestor: &str,
        descendant: &str,
    ) -> EndpointResponse<ConceptLinkRecord> {
        self.serve(
            ConceptLinkingHandler,
            true,
            EstablishLink {
                auth_token: Some(token.clone()),
                link: ConceptLinkRecord {
                    ancestor: ancestor.into(),
                    descendant: descendant.into(),
                },
            },
        )
    }

    fn concept(&self, author: &str, title: &str, simple: bool) -> EndpointResponse<ConceptView> {
        self.serve(
            SpecificConceptRetrievalHandler,
            false,
            ConceptRequest {
                author: author.into(),
                title: title.into(),
                simple,
            },
        )
    }
}

#[test]
fn test_authenticate_with_correct_credentials() {
    let h = harness();
    h.create_account("alice", "s3cret-pass");

    let result = h.login("alice", "s3cret-pass");
    assert_eq!(result.code, StatusCode::OK);
    let token = result.payload().unwrap();
    assert_eq!(token.presenter, "alice");

    let verdict = h.signer.verify_token(&token.token);
    assert!(verdict.valid);
    assert_eq!(verdict.claims.unwrap().username, "alice");
}

#[test]
fn test_authenticate_with_bad_credentials() {
    let h = harness();
    h.create_account("alice", "s3cret-pass");

    for (name, password) in [("alice", "wrong"), ("nobody", "s3cret-pass")] {
        let result = h.login(name, password);
        assert_eq!(result.code, StatusCode::UNAUTHORIZED);
        assert_eq!(result.err_msg(), Some("Invalid display name or password"));
    }
}

#[test]
fn test_duplicate_account_is_forbidden() {
    let h = harness();
    let first = h.create_account("alice", "pw");
    assert_eq!(first.code, StatusCode::CREATED);
    assert_eq!(first.payload().unwrap().msg, "alice account created");

    let again = h.create_account("alice", "other");
    assert_eq!(again.code, StatusCode::FORBIDDEN);
    assert_eq!(again.err_msg(), Some("Display name alice is already taken"));
}

#[test]
fn test_profile_retrieval() {
    let h = harness();
    h.create_account("alice", "pw");

    let found = h.serve(ProfileRetrievalHandler, false, "alice".to_string());
    assert_eq!(found.code, StatusCode::OK);
    let profile = found.payload().unwrap();
    assert_eq!(profile.preferred_name, "alice");
    assert!(profile.avatar_url.contains("/avatars/alice?method=GET"));

    let missing = h.serve(ProfileRetrievalHandler, false, "ghost".to_string());
    assert_eq!(missing.code, StatusCode::NOT_FOUND);
    assert_eq!(missing.err_msg(), Some("Profile for ghost is not available"));
}

#[test]
fn test_missing_concept_is_not_found() {
    let h = harness();
    let result = h.concept("alice", "nothing", false);
    assert_eq!(result.code, StatusCode::NOT_FOUND);
    assert_eq!(result.err_msg(), Some("No match for `alice/nothing`"));
}

#[test]
fn test_concept_creation_and_retrieval() {
    let h = harness();
    let alice = h.member("alice");

    let created = h.create_concept(&alice, "alice", "jetpack");
    assert_eq!(created.code, StatusCode::CREATED);
    let view = created.payload().unwrap();
    assert_eq!(view.identifier, "alice/jetpack");
    assert!(view.thumbnail_url.contains("thumbnails/alice/jetpack?method=PUT"));

    match h.concept("alice", "jetpack", false).payload().unwrap() {
        ConceptView::Full(full) => {
            assert_eq!(full.description, "About jetpack");
            assert!(full.diagram.is_object());
            assert_eq!(full.diagram["nodes"][0]["label"], "jetpack");
            assert_eq!(full.diagram, json!({"nodes": [{"id": 1, "label": "jetpack"}]}));
        }
        other => panic!("expected full view, got {:?}", other),
    }
    assert!(matches!(
        h.concept("alice", "jetpack", true).payload().unwrap(),
        ConceptView::Simple(simple) if simple.identifier == "alice/jetpack"
    ));

    let duplicate = h.create_concept(&alice, "alice", "jetpack");
    assert_eq!(duplicate.code, StatusCode::FORBIDDEN);
}

#[test]
fn test_invalid_title_is_rejected() {
    let h = harness();
    let alice = h.member("alice");
    let result = h.create_concept(&alice, "alice", "no spaces allowed");
    assert_eq!(result.code, StatusCode::BAD_REQUEST);
}

#[test]
fn test_creation_with_someone_elses_token() {
    let h = harness();
    let _alice = h.member("alice");
    let mallory = h.member("mallory");

    let result = h.create_concept(&mallory, "alice", "forged");
    assert_eq!(result.code, StatusCode::UNAUTHORIZED);
    assert_eq!(result.err_msg(), Some("Cannot verify ownership of token."));
    assert_eq!(h.concept("alice", "forged", true).code, StatusCode::NOT_FOUND);
}

#[test]
fn test_lineage_with_two_ancestors_and_two_children() {
    let h = harness();
    let alice = h.member("alice");
    for title in ["grandparent", "parent", "focus", "kid-one", "kid-two"] {
        assert_eq!(h.create_concept(&alice, "alice", title).code, StatusCode::CREATED);
    }
    h.link(&alice, "alice/grandparent", "alice/parent");
    h.link(&alice, "alice/parent", "alice/focus");
    h.link(&alice, "alice/focus", "alice/kid-one");
    h.link(&alice, "alice/focus", "alice/kid-two");

    let result = h.serve(
        ConceptLineageHandler,
        false,
        ConceptRequest {
            author: "alice".into(),
            title: "focus".into(),
            simple: true,
        },
    );
    assert_eq!(result.code, StatusCode::OK);
    let lineage = result.payload().unwrap();
    assert_eq!(lineage.nodes, 5);

    let root = lineage.lineage.as_object().unwrap();
    assert_eq!(root.len(), 1);
    let parent = &root["alice/grandparent"]["children"][0]["alice/parent"];
    let focus = &parent["children"][0]["alice/focus"];
    let kids = focus["children"].as_array().unwrap();
    assert_eq!(kids.len(), 2);
    assert!(kids[0].get("alice/kid-one").is_some());
    assert_eq!(focus["data"]["identifier"], "alice/focus");
}

#[test]
fn test_lineage_of_missing_concept() {
    let h = harness();
    let result = h.serve(
        ConceptLineageHandler,
        false,
        ConceptRequest {
            author: "alice".into(),
            title: "ghost".into(),
            simple: true,
        },
    );
    assert_eq!(result.code, StatusCode::NOT_FOUND);
    assert_eq!(result.err_msg(), Some("Could not build the lineage for alice/ghost"));
}

#[test]
fn test_links_that_would_break_the_dag() {
    let h = harness();
    let alice = h.member("alice");
    for title in ["first", "second", "third"] {
        h.create_concept(&alice, "alice", title);
    }
    assert_eq!(h.link(&alice, "alice/first", "alice/second").code, StatusCode::CREATED);
    assert_eq!(h.link(&alice, "alice/second", "alice/third").code, StatusCode::CREATED);

    assert_eq!(h.link(&alice, "alice/third", "alice/first").code, StatusCode::FORBIDDEN);
    assert_eq!(h.link(&alice, "alice/first", "alice/first").code, StatusCode::FORBIDDEN);
    assert_eq!(h.link(&alice, "alice/first", "alice/second").code, StatusCode::FORBIDDEN);
    assert_eq!(h.link(&alice, "alice/first", "alice/missing").code, StatusCode::FORBIDDEN);
}

#[test]
fn test_search_respects_fuzzy_option_and_window() {
    let h = harness();
    let alice = h.member("alice");
    h.create_concept(&alice, "alice", "rocket-boots");
    h.create_concept(&alice, "alice", "rocket-skates");
    h.create_concept(&alice, "alice", "umbrella");

    let search = |title: &str, fuzzy: FuzzyOption, hours: i64| {
        h.serve(
            ConceptSearchResultHandler,
            false,
            ConceptSearchQuery {
                author: "alice".into(),
                title: title.into(),
                not_before: Utc::now() - Duration::hours(hours),
                not_after: Utc::now() + Duration::hours(1),
                fuzzy,
            },
        )
    };

    let fuzzy = search("rocket", FuzzyOption::Title, 1);
    assert_eq!(fuzzy.code, StatusCode::OK);
    assert_eq!(fuzzy.payload().unwrap().len(), 2);

    let exact = search("rocket", FuzzyOption::None, 1);
    assert!(exact.payload().unwrap().is_empty());

    let exact = search("umbrella", FuzzyOption::None, 1);
    assert_eq!(exact.payload().unwrap()[0].identifier, "alice/umbrella");

    let future_window = search("rocket", FuzzyOption::Title, -1);
    assert!(future_window.payload().unwrap().is_empty());
}

#[test]
fn test_follow_check_and_unfollow() {
    let h = harness();
    let alice = h.member("alice");
    h.member("bob");

    let followed = h.serve(
        FollowAccountHandler,
        true,
        FollowRequest {
            auth_token: Some(alice.clone()),
            follower: "alice".into(),
            followee: "bob".into(),
        },
    );
    assert_eq!(followed.code, StatusCode::CREATED);

    let check = |h: &Harness| {
        h.serve(
            CheckFollowingStatusHandler,
            false,
            AccountFollowingRecord {
                follower: "alice".into(),
                followee: "bob".into(),
            },
        )
    };
    let following = check(&h);
    assert_eq!(following.code, StatusCode::OK);
    assert_eq!(following.payload().unwrap().msg, "alice is following bob");

    let stopped = h.serve(
        StopFollowingAccountHandler,
        true,
        UnfollowRequest {
            auth_token: Some(alice),
            follower: "alice".into(),
            followee: "bob".into(),
        },
    );
    assert_eq!(stopped.code, StatusCode::OK);
    assert_eq!(stopped.payload().unwrap().msg, "alice is no longer following bob");

    let not_following = check(&h);
    assert_eq!(not_following.code, StatusCode::NOT_FOUND);
    assert_eq!(not_following.err_msg(), Some("alice is not following bob"));
}

#[test]
fn test_unfollow_without_token_touches_nothing() {
    let h = harness();
    let result = h.serve(
        StopFollowingAccountHandler,
        true,
        UnfollowRequest {
            auth_token: None,
            follower: "alice".into(),
            followee: "bob".into(),
        },
    );
    assert_eq!(result.code, StatusCode::UNAUTHORIZED);
    assert_eq!(result.err_msg(), Some("Invalid token presented."));
}

#[test]
fn test_like_check_and_unlike() {
    let h = harness();
    let alice = h.member("alice");
    let bob = h.member("bob");
    h.create_concept(&alice, "alice", "jetpack");

    let liked = h.serve(
        LikeConceptHandler,
        true,
        LikeRequest {
            auth_token: Some(bob.clone()),
            user_liking: "bob".into(),
            concept_liked: "alice/jetpack".into(),
        },
    );
    assert_eq!(liked.code, StatusCode::CREATED);

    let record = ConceptLikingRecord {
        user_liking: "bob".into(),
        concept_liked: "alice/jetpack".into(),
    };
    let likes = h.serve(CheckLikingStatusHandler, false, record.clone());
    assert_eq!(likes.payload().unwrap().msg, "bob does like alice/jetpack");

    let unliked = h.serve(
        StopLikingConceptHandler,
        true,
        UnlikeRequest {
            auth_token: Some(bob),
            user_liking: "bob".into(),
            concept_liked: "alice/jetpack".into(),
        },
    );
    assert_eq!(unliked.payload().unwrap().msg, "bob no longer likes alice/jetpack");

    let likes = h.serve(CheckLikingStatusHandler, false, record);
    assert_eq!(likes.code, StatusCode::NOT_FOUND);
    assert_eq!(likes.err_msg(), Some("bob does not like alice/jetpack"));
}

#[test]
fn test_comment_threads_nest_replies() {
    let h = harness();
    let alice = h.member("alice");
    let bob = h.member("bob");
    h.create_concept(&alice, "alice", "jetpack");

    let post = |token: &AuthorizationToken, by: &str, text: &str, response_to: Option<i64>| {
        h.serve(
            ConceptCommentingHandler,
            true,
            CommentRequest {
                auth_token: Some(token.clone()),
                concept_id: "alice/jetpack".into(),
                comment_by: by.into(),
                free_text: text.into(),
                response_to,
            },
        )
    };
    assert_eq!(post(&bob, "bob", "Love it", None).code, StatusCode::CREATED);

    let threads = h.serve(
        ConceptCommentsSectionHandler,
        false,
        ConceptRequest {
            author: "alice".into(),
            title: "jetpack".into(),
            simple: true,
        },
    );
    let first = threads.payload().unwrap().threads[0].comment_id;
    assert_eq!(post(&alice, "alice", "Thanks!", Some(first)).code, StatusCode::CREATED);
    assert_eq!(post(&bob, "bob", "Second thread", None).code, StatusCode::CREATED);

    let threads = h.serve(
        ConceptCommentsSectionHandler,
        false,
        ConceptRequest {
            author: "alice".into(),
            title: "jetpack".into(),
            simple: true,
        },
    );
    let threads = &threads.payload().unwrap().threads;
    assert_eq!(threads.len(), 2);
    assert_eq!(threads[0].comment_text, "Love it");
    assert_eq!(threads[0].responses.len(), 1);
    assert_eq!(threads[0].responses[0].comment_author, "alice");
    assert!(threads[1].responses.is_empty());
}

#[test]
fn test_handler_lifecycle_misuse() {
    let h = harness();
    let mut handler = EndpointHandler::new(ProfileRetrievalHandler);
    handler.use_service(RegisteredService::AccountsDs, h.provider.clone());

    assert!(matches!(
        handler.result(),
        Err(IdeaBankError::PrematureResultRetrieval(_))
    ));
    handler.receive("ghost".to_string()).unwrap();
    assert_eq!(handler.status(), HandlerState::Error);
    assert!(matches!(
        handler.receive("ghost".to_string()),
        Err(IdeaBankError::HandlerNotIdle(_))
    ));
}

#[test]
fn test_failed_scope_commits_nothing() {
    let h = harness();
    let outcome: ideabank::Result<()> = h.provider.within_scope(|scope| {
        scope.execute(Statement::new(
            "INSERT INTO accounts (display_name, password_hash, salt_value, created_at, updated_at) \
             VALUES ('temp', 'x', 'y', 'now', 'now')",
        ))?;
        Err(IdeaBankError::Internal("abandon".into()))
    });
    assert!(outcome.is_err());

    let count: i64 = h
        .db
        .with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?)
        })
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn test_write_statements_report_changed_rows() {
    let h = harness();
    h.create_account("alice", "pw");
    h.create_account("bob", "pw");

    let changed = h
        .provider
        .within_scope(|scope| {
            let follow = scope.execute(
                Statement::new(
                    "INSERT INTO follows (follower, followee, followed_on) VALUES (?1, ?2, 'now')",
                )
                .bind("alice")
                .bind("bob"),
            )?;
            let unfollow = scope.execute(
                Statement::new("DELETE FROM follows WHERE follower = ?1").bind("nobody"),
            )?;
            Ok((follow.rows_affected(), unfollow.rows_affected()))
        })
        .unwrap();
    assert_eq!(changed, (1, 0));
}

#[test]
fn test_reply_must_target_a_comment_on_the_same_concept() {
    let h = harness();
    let alice = h.member("alice");
    h.create_concept(&alice, "alice", "jetpack");
    h.create_concept(&alice, "alice", "umbrella");

    let post = |concept: &str, response_to: Option<i64>| {
        h.serve(
            ConceptCommentingHandler,
            true,
            CommentRequest {
                auth_token: Some(alice.clone()),
                concept_id: concept.into(),
                comment_by: "alice".into(),
                free_text: "Hello".into(),
                response_to,
            },
        )
    };
    assert_eq!(post("alice/jetpack", None).code, StatusCode::CREATED);

    let threads = h.serve(
        ConceptCommentsSectionHandler,
        false,
        ConceptRequest {
            author: "alice".into(),
            title: "jetpack".into(),
            simple: true,
        },
    );
    let on_jetpack = threads.payload().unwrap().threads[0].comment_id;

    let stray = post("alice/umbrella", Some(on_jetpack));
    assert_eq!(stray.code, StatusCode::FORBIDDEN);
    assert_eq!(post("alice/jetpack", Some(on_jetpack)).code, StatusCode::CREATED);
    assert_eq!(post("alice/jetpack", Some(on_jetpack + 100)).code, StatusCode::FORBIDDEN);

    let count: i64 = h
        .db
        .with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM comments WHERE comment_on = 'alice/umbrella'",
                [],
                |row| row.get(0),
            )?)
        })
        .unwrap();
    assert_eq!(count, 0);
}
