//! Slash-separated paths into the document hierarchy.
//!
//! A collection path has an odd number of segments (`conversations`,
//! `conversations/c1/messages`), a document path an even number
//! (`conversations/c1`, `conversations/c1/messages/m1`).

use std::fmt;

use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionRef {
    path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentRef {
    path: String,
}

fn segments(path: &str) -> StoreResult<Vec<&str>> {
    let parts: Vec<&str> = path.split('/').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(parts)
}

fn check_id(id: &str) -> StoreResult<()> {
    if id.is_empty() || id.contains('/') {
        return Err(StoreError::InvalidPath(id.to_string()));
    }
    Ok(())
}

impl CollectionRef {
    /// A top-level collection such as `conversations`.
    pub fn root(id: &str) -> StoreResult<Self> {
        check_id(id)?;
        Ok(Self {
            path: id.to_string(),
        })
    }

    pub fn parse(path: &str) -> StoreResult<Self> {
        let parts = segments(path)?;
        if parts.len() % 2 == 0 {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        Ok(Self {
            path: path.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn id(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn doc(&self, id: &str) -> StoreResult<DocumentRef> {
        check_id(id)?;
        Ok(DocumentRef {
            path: format!("{}/{}", self.path, id),
        })
    }

    /// The document owning this collection, `None` for top-level collections.
    pub fn parent(&self) -> Option<DocumentRef> {
        self.path.rsplit_once('/').map(|(parent, _)| DocumentRef {
            path: parent.to_string(),
        })
    }
}

impl DocumentRef {
    pub fn parse(path: &str) -> StoreResult<Self> {
        let parts = segments(path)?;
        if parts.len() % 2 != 0 {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        Ok(Self {
            path: path.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn id(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn collection(&self, id: &str) -> StoreResult<CollectionRef> {
        check_id(id)?;
        Ok(CollectionRef {
            path: format!("{}/{}", self.path, id),
        })
    }

    pub fn parent(&self) -> CollectionRef {
        let (parent, _) = self
            .path
            .rsplit_once('/')
            .unwrap_or((self.path.as_str(), ""));
        CollectionRef {
            path: parent.to_string(),
        }
    }

    /// Documents enclosing this one, nearest first.
    pub fn ancestors(&self) -> Vec<DocumentRef> {
        let mut ancestors = Vec::new();
        let mut current = self.parent().parent();
        while let Some(doc) = current {
            current = doc.parent().parent();
            ancestors.push(doc);
        }
        ancestors
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/')
    }
}

/// First segment of `path` below `prefix`, which must end with `/`.
pub(crate) fn child_segment<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    path.strip_prefix(prefix)?.split('/').next()
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_nested_paths() {
        let conversations = CollectionRef::root("conversations").unwrap();
        let c1 = conversations.doc("c1").unwrap();
        let messages = c1.collection("messages").unwrap();
        let m1 = messages.doc("m1").unwrap();

        assert_eq!(m1.path(), "conversations/c1/messages/m1");
        assert_eq!(m1.id(), "m1");
        assert_eq!(m1.parent(), messages);
        assert_eq!(messages.parent(), Some(c1.clone()));
        assert_eq!(messages.id(), "messages");
        assert_eq!(conversations.parent(), None);
        assert_eq!(c1.parent(), conversations);
    }

    #[test]
    fn ancestors_walk_up_to_the_top_level() {
        let r1 = DocumentRef::parse("conversations/c1/messages/m1/reactions/r1").unwrap();
        let ancestors_refs = r1.ancestors();
        let ancestors: Vec<&str> = ancestors_refs.iter().map(|d| d.path()).collect();
        assert_eq!(ancestors, vec!["conversations/c1/messages/m1", "conversations/c1"]);
        assert!(DocumentRef::parse("conversations/c1").unwrap().ancestors().is_empty());
    }

    #[test]
    fn child_segment_stops_at_the_next_separator() {
        let prefix = "conversations/c1/";
        assert_eq!(child_segment("conversations/c1/messages/m1", prefix), Some("messages"));
        assert_eq!(child_segment("conversations/c10/messages/m1", prefix), None);
        assert_eq!(child_segment("conversations/c1", prefix), None);
    }

    #[test]
    fn rejects_ids_with_separators() {
        let conversations = CollectionRef::root("conversations").unwrap();
        assert!(matches!(
            conversations.doc("a/b"),
            Err(StoreError::InvalidPath(_))
        ));
        assert!(conversations.doc("").is_err());
    }

    #[test]
    fn parse_checks_segment_parity() {
        assert!(DocumentRef::parse("conversations/c1").is_ok());
        assert!(DocumentRef::parse("conversations").is_err());
        assert!(DocumentRef::parse("conversations//c1").is_err());
        assert!(CollectionRef::parse("conversations/c1/messages").is_ok());
        assert!(CollectionRef::parse("conversations/c1").is_err());
    }
}
