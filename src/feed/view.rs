use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::feed::error::FeedError;
use crate::feed::model::{Campus, Post};

/// Which half of the feed a view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    #[default]
    Confessions,
    Communities,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Confessions => "confessions",
            Section::Communities => "communities",
        }
    }

    pub fn includes(&self, post: &Post) -> bool {
        match self {
            Section::Communities => post.is_community,
            Section::Confessions => !post.is_community,
        }
    }
}

impl FromStr for Section {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confessions" => Ok(Section::Confessions),
            "communities" => Ok(Section::Communities),
            other => Err(FeedError::Validation(format!("Unknown section: {}", other))),
        }
    }
}

/// Filter arguments for [`filtered_view`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedQuery {
    pub section: Section,
    pub campus: Option<Campus>,
    /// Lower-cased search needle; `None` when the query is blank.
    search: Option<String>,
}

impl FeedQuery {
    pub fn new(section: Section) -> Self {
        Self {
            section,
            campus: None,
            search: None,
        }
    }

    pub fn campus(mut self, campus: Option<Campus>) -> Self {
        self.campus = campus;
        self
    }

    /// A query that is blank after trimming disables search.
    pub fn search(mut self, query: &str) -> Self {
        self.search = if query.trim().is_empty() {
            None
        } else {
            Some(query.to_lowercase())
        };
        self
    }

    pub fn search_text(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn matches(&self, post: &Post) -> bool {
        if !self.section.includes(post) {
            return false;
        }
        if let Some(campus) = self.campus {
            if post.campus != campus {
                return false;
            }
        }
        match &self.search {
            Some(needle) => {
                post.text.to_lowercase().contains(needle.as_str())
                    || post.author_name.to_lowercase().contains(needle.as_str())
            }
            None => true,
        }
    }
}

/// A derived, read-only view over a post collection.
///
/// Nothing is computed until iteration, and every call to [`FeedView::iter`]
/// recomputes from the borrowed posts.
#[derive(Debug, Clone)]
pub struct FeedView<'a> {
    posts: &'a [Post],
    query: FeedQuery,
}

pub fn filtered_view<'a>(posts: &'a [Post], query: &FeedQuery) -> FeedView<'a> {
    FeedView {
        posts,
        query: query.clone(),
    }
}

impl<'a> FeedView<'a> {
    /// Matching posts, newest first. Ties keep their order in the source.
    pub fn iter(&self) -> std::vec::IntoIter<&'a Post> {
        let mut matched: Vec<&'a Post> = self
            .posts
            .iter()
            .filter(|post| self.query.matches(post))
            .collect();
        // sort_by is stable
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matched.into_iter()
    }

    pub fn query(&self) -> &FeedQuery {
        &self.query
    }

    pub fn len(&self) -> usize {
        self.posts.iter().filter(|p| self.query.matches(p)).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.posts.iter().any(|p| self.query.matches(p))
    }

    pub fn to_vec(&self) -> Vec<Post> {
        self.iter().cloned().collect()
    }
}

impl<'v, 'a> IntoIterator for &'v FeedView<'a> {
    type Item = &'a Post;
    type IntoIter = std::vec::IntoIter<&'a Post>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn post(id: &str, text: &str, campus: Campus, community: bool, age_min: i64) -> Post {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        Post {
            id: id.to_string(),
            user_id: "u1".to_string(),
            author_name: "Brave Panda".to_string(),
            text: text.to_string(),
            media: None,
            campus,
            created_at: base - Duration::minutes(age_min),
            is_community: community,
            reactions: Vec::new(),
            comments: Vec::new(),
            reaction_count: 0,
            comment_count: 0,
            version: 0,
        }
    }

    fn ids(view: &FeedView<'_>) -> Vec<String> {
        view.iter().map(|p| p.id.clone()).collect()
    }

    #[test]
    fn section_filter_splits_on_community_flag() {
        let posts = vec![
            post("a", "one", Campus::Vellore, false, 1),
            post("b", "two", Campus::Vellore, true, 2),
        ];
        let confessions = filtered_view(&posts, &FeedQuery::new(Section::Confessions));
        let communities = filtered_view(&posts, &FeedQuery::new(Section::Communities));
        assert_eq!(ids(&confessions), vec!["a"]);
        assert_eq!(ids(&communities), vec!["b"]);
    }

    #[test]
    fn campus_filter_applies_only_when_set() {
        let posts = vec![
            post("a", "one", Campus::Vellore, false, 1),
            post("b", "two", Campus::Chennai, false, 2),
        ];
        let all = filtered_view(&posts, &FeedQuery::new(Section::Confessions));
        assert_eq!(all.len(), 2);
        let chennai = filtered_view(
            &posts,
            &FeedQuery::new(Section::Confessions).campus(Some(Campus::Chennai)),
        );
        assert_eq!(ids(&chennai), vec!["b"]);
    }

    #[test]
    fn search_matches_text_or_pseudonym_case_insensitively() {
        let mut by_owl = post("c", "nothing here", Campus::Ap, false, 3);
        by_owl.author_name = "Swift Owl".to_string();
        let posts = vec![
            post("a", "Hello there", Campus::Ap, false, 1),
            post("b", "Goodbye", Campus::Ap, false, 2),
            by_owl,
        ];
        let hello = filtered_view(&posts, &FeedQuery::new(Section::Confessions).search("hello"));
        assert_eq!(ids(&hello), vec!["a"]);
        let owl = filtered_view(&posts, &FeedQuery::new(Section::Confessions).search("OWL"));
        assert_eq!(ids(&owl), vec!["c"]);
    }

    #[test]
    fn blank_search_is_ignored() {
        let query = FeedQuery::new(Section::Confessions).search("   ");
        assert_eq!(query.search_text(), None);
    }

    #[test]
    fn sorted_newest_first_with_stable_ties() {
        let posts = vec![
            post("old", "x", Campus::Ap, false, 30),
            post("tie1", "x", Campus::Ap, false, 5),
            post("new", "x", Campus::Ap, false, 0),
            post("tie2", "x", Campus::Ap, false, 5),
        ];
        let view = filtered_view(&posts, &FeedQuery::new(Section::Confessions));
        assert_eq!(ids(&view), vec!["new", "tie1", "tie2", "old"]);
    }

    #[test]
    fn view_is_restartable_and_leaves_source_alone() {
        let posts = vec![
            post("a", "x", Campus::Ap, false, 10),
            post("b", "x", Campus::Ap, false, 0),
        ];
        let before = posts.clone();
        let view = filtered_view(&posts, &FeedQuery::new(Section::Confessions));
        let first = ids(&view);
        let second: Vec<String> = (&view).into_iter().map(|p| p.id.clone()).collect();
        assert_eq!(first, second);
        assert_eq!(posts, before);
    }

    #[test]
    fn section_parses() {
        assert_eq!("communities".parse::<Section>().unwrap(), Section::Communities);
        assert!("groups".parse::<Section>().is_err());
    }
}
