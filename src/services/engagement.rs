//! Follow, like and comment query builders

use chrono::Utc;

use crate::db::Statement;

/// Builds statements against `follows`, `likes` and `comments`
pub struct EngagementDataService;

impl EngagementDataService {
    pub fn start_following(follower: &str, followee: &str) -> Statement {
        Statement::new(
            "INSERT INTO follows (follower, followee, followed_on) VALUES (?1, ?2, ?3) \
             RETURNING follower, followee",
        )
        .bind(follower)
        .bind(followee)
        .bind(Utc::now())
    }

    pub fn check_following(follower: &str, followee: &str) -> Statement {
        Statement::new("SELECT follower, followee FROM follows WHERE follower = ?1 AND followee = ?2")
            .bind(follower)
            .bind(followee)
    }

    pub fn revoke_following(follower: &str, followee: &str) -> Statement {
        Statement::new("DELETE FROM follows WHERE follower = ?1 AND followee = ?2")
            .bind(follower)
            .bind(followee)
    }

    pub fn start_liking(account: &str, concept: &str) -> Statement {
        Statement::new(
            "INSERT INTO likes (user_liking, concept_liked, liked_on) VALUES (?1, ?2, ?3) \
             RETURNING user_liking, concept_liked",
        )
        .bind(account)
        .bind(concept)
        .bind(Utc::now())
    }

    pub fn check_liking(account: &str, concept: &str) -> Statement {
        Statement::new(
            "SELECT user_liking, concept_liked FROM likes WHERE user_liking = ?1 AND concept_liked = ?2",
        )
        .bind(account)
        .bind(concept)
    }

    pub fn revoke_liking(account_unliking: &str, concept_unliked: &str) -> Statement {
        Statement::new("DELETE FROM likes WHERE user_liking = ?1 AND concept_liked = ?2")
            .bind(account_unliking)
            .bind(concept_unliked)
    }

    /// Post a comment, optionally in reply to another; returns the new comment id
    pub fn comment_on(
        concept_id: &str,
        comment_by: &str,
        free_text: &str,
        response_to: Option<i64>,
    ) -> Statement {
        Statement::new(
            "INSERT INTO comments (comment_on, comment_by, free_text, response_to, created_at) \
             SELECT ?1, ?2, ?3, ?4, ?5 \
             WHERE ?4 IS NULL \
                OR EXISTS (SELECT 1 FROM comments WHERE comment_id = ?4 AND comment_on = ?1) \
             RETURNING comment_id",
        )
        .bind(concept_id)
        .bind(comment_by)
        .bind(free_text)
        .bind(response_to)
        .bind(Utc::now())
    }

    /// Top-level comments when `response_to` is `None`, replies otherwise
    pub fn comments_on(concept_id: &str, response_to: Option<i64>) -> Statement {
        Statement::new(
            "SELECT comment_id, comment_by, free_text FROM comments \
             WHERE comment_on = ?1 AND response_to IS ?2 \
             ORDER BY created_at, comment_id",
        )
        .bind(concept_id)
        .bind(response_to)
    }
}
