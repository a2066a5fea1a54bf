//! Concept and lineage query builders

use chrono::{DateTime, Utc};

use crate::db::{Param, Statement};
use crate::models::FuzzyOption;

/// Builds statements against `concepts` and `concept_links`
pub struct ConceptsDataService;

impl ConceptsDataService {
    /// Insert a concept keyed `author/title`; returns the identifier
    pub fn create_concept(
        title: &str,
        author: &str,
        description: &str,
        diagram: &serde_json::Value,
    ) -> Statement {
        let now = Utc::now();
        Statement::new(
            "INSERT INTO concepts (identifier, title, author, description, diagram, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
             RETURNING identifier",
        )
        .bind(format!("{author}/{title}"))
        .bind(title)
        .bind(author)
        .bind(description)
        .bind(Param::Json(diagram.clone()))
        .bind(now)
        .bind(now)
    }

    pub fn find_exact_concept(title: &str, author: &str) -> Statement {
        Statement::new(
            "SELECT author, title, description, diagram FROM concepts WHERE title = ?1 AND author = ?2",
        )
        .bind(title)
        .bind(author)
    }

    pub fn link_existing_concept(ancestor: &str, descendant: &str) -> Statement {
        Statement::new(
            "INSERT INTO concept_links (ancestor, descendant) VALUES (?1, ?2) \
             RETURNING ancestor, descendant",
        )
        .bind(ancestor)
        .bind(descendant)
    }

    /// Counts how often `ancestor` is reachable below `descendant`; non-zero means
    /// linking them would close a cycle
    pub fn would_create_cycle(ancestor: &str, descendant: &str) -> Statement {
        Statement::new(
            "WITH RECURSIVE reachable(node) AS ( \
             SELECT descendant FROM concept_links WHERE ancestor = ?1 \
             UNION \
             SELECT concept_links.descendant FROM concept_links \
             JOIN reachable ON concept_links.ancestor = reachable.node) \
             SELECT COUNT(*) AS hits FROM reachable WHERE node = ?2",
        )
        .bind(descendant)
        .bind(ancestor)
    }

    /// Search by author and title under the given fuzzy policy, limited to
    /// concepts updated strictly between `not_before` and `not_after`
    pub fn query_concepts(
        title: &str,
        author: &str,
        not_before: DateTime<Utc>,
        not_after: DateTime<Utc>,
        fuzzy: FuzzyOption,
    ) -> Statement {
        let (author_op, author_value) = match fuzzy {
            FuzzyOption::All | FuzzyOption::Author => ("LIKE", format!("%{author}%")),
            FuzzyOption::None | FuzzyOption::Title => ("=", author.to_string()),
        };
        let (title_op, title_value) = match fuzzy {
            FuzzyOption::All | FuzzyOption::Title => ("LIKE", format!("%{title}%")),
            FuzzyOption::None | FuzzyOption::Author => ("=", title.to_string()),
        };

        Statement::new(format!(
            "SELECT identifier FROM concepts \
             WHERE author {author_op} ?1 AND title {title_op} ?2 \
             AND updated_at > ?3 AND updated_at < ?4 \
             ORDER BY updated_at DESC"
        ))
        .bind(author_value)
        .bind(title_value)
        .bind(not_before)
        .bind(not_after)
    }

    /// Ancestor edges of `identifier` up to `depth` hops, nearest first
    pub fn find_parent_ideas(identifier: &str, depth: i64) -> Statement {
        Self::walk_links("descendant", "ancestor", identifier, depth)
    }

    /// Descendant edges of `identifier` up to `depth` hops, nearest first
    pub fn find_child_ideas(identifier: &str, depth: i64) -> Statement {
        Self::walk_links("ancestor", "descendant", identifier, depth)
    }

    fn walk_links(from: &str, towards: &str, identifier: &str, depth: i64) -> Statement {
        Statement::new(format!(
            "WITH RECURSIVE walk(descendant, ancestor, depth) AS ( \
             SELECT descendant, ancestor, 1 FROM concept_links WHERE {from} = ?1 \
             UNION ALL \
             SELECT concept_links.descendant, concept_links.ancestor, walk.depth + 1 \
             FROM concept_links, walk \
             WHERE concept_links.{from} = walk.{towards} AND walk.depth < ?2) \
             SELECT ancestor, descendant, depth FROM walk WHERE depth <= ?2 ORDER BY depth"
        ))
        .bind(identifier)
        .bind(depth)
    }
}
