//! Filesystem nodes backed by remote objects.
//!
//! A [`Node`] is what the caches store and what the [`Lister`](crate::lister::Lister) enriches.
//! The filesystem adapter owns everything else about a node (inode numbers, open handles,
//! permissions); this module only models the fields the core reads or rewrites.

use std::collections::BTreeMap;
use std::time::SystemTime;

/// Header carrying the `container/prefix` location of a segmented object's parts.
pub const MANIFEST_HEADER: &str = "x-object-manifest";

/// Content type the object store uses for pseudo-directory marker objects.
pub const DIRECTORY_CONTENT_TYPE: &str = "application/directory";

/// Content type the object store uses for symbolic links.
pub const LINK_CONTENT_TYPE: &str = "application/link";

/// Remote object description, as returned by a listing or a metadata request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectDescriptor {
    /// Full object name within its container, e.g. `photos/2024/a.jpg`.
    pub name: String,
    /// Object size in bytes.
    pub bytes: u64,
    /// Content type reported by the store.
    pub content_type: String,
    /// Entity tag (content hash) reported by the store.
    pub etag: Option<String>,
    /// Last modification time reported by the store.
    pub last_modified: Option<SystemTime>,
}

impl ObjectDescriptor {
    /// A descriptor that only carries a name. Used for placeholders.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Response headers of a metadata request.
///
/// Header names are case-insensitive; they are stored lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    /// Creates an empty header map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a header, replacing any previous value under the same (case-folded) name.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.to_ascii_lowercase(), value.into())
    }

    /// Returns the value of header `name`, compared case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no headers are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates headers in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<N: AsRef<str>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name.as_ref(), value);
        }
        headers
    }
}

/// Returns `true` if `headers` mark a segmented object, i.e. the manifest header points at a
/// `container/prefix` location for the segments.
#[must_use]
pub fn is_segment_manifest(headers: &Headers) -> bool {
    headers
        .get(MANIFEST_HEADER)
        .and_then(|location| location.split_once('/'))
        .is_some_and(|(container, _)| !container.is_empty())
}

/// A regular object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectNode {
    /// Container holding the object.
    pub container: String,
    /// Remote description of the object.
    pub descriptor: ObjectDescriptor,
    /// Headers from the last metadata request, empty for placeholders.
    pub headers: Headers,
    /// Whether the object is a manifest over segments.
    pub segmented: bool,
}

/// A directory, either a pseudo-directory from a delimited listing or a marker object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    /// Container holding the directory.
    pub container: String,
    /// Remote description of the directory marker.
    pub descriptor: ObjectDescriptor,
    /// Headers from the last metadata request, empty for placeholders.
    pub headers: Headers,
}

/// A symbolic link stored as an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymlinkNode {
    /// Container holding the link object.
    pub container: String,
    /// Remote description of the link object.
    pub descriptor: ObjectDescriptor,
    /// Headers from the last metadata request, empty for placeholders.
    pub headers: Headers,
}

/// A filesystem entry backed by a remote object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A regular object.
    Object(ObjectNode),
    /// A directory.
    Directory(DirectoryNode),
    /// A symbolic link.
    Symlink(SymlinkNode),
}

impl Node {
    /// Creates an object placeholder.
    #[must_use]
    pub fn object(container: impl Into<String>, descriptor: ObjectDescriptor) -> Self {
        Self::Object(ObjectNode {
            container: container.into(),
            descriptor,
            headers: Headers::new(),
            segmented: false,
        })
    }

    /// Creates a directory placeholder.
    #[must_use]
    pub fn directory(container: impl Into<String>, descriptor: ObjectDescriptor) -> Self {
        Self::Directory(DirectoryNode {
            container: container.into(),
            descriptor,
            headers: Headers::new(),
        })
    }

    /// Creates a symlink placeholder.
    #[must_use]
    pub fn symlink(container: impl Into<String>, descriptor: ObjectDescriptor) -> Self {
        Self::Symlink(SymlinkNode {
            container: container.into(),
            descriptor,
            headers: Headers::new(),
        })
    }

    /// Builds the placeholder for one entry of a container listing.
    ///
    /// Names ending in `/` (delimiter pseudo-directories) and directory marker objects become
    /// directories, link objects become symlinks, anything else is a regular object.
    #[must_use]
    pub fn from_listing(container: impl Into<String>, descriptor: ObjectDescriptor) -> Self {
        if descriptor.name.ends_with('/') || descriptor.content_type == DIRECTORY_CONTENT_TYPE {
            Self::directory(container, descriptor)
        } else if descriptor.content_type == LINK_CONTENT_TYPE {
            Self::symlink(container, descriptor)
        } else {
            Self::object(container, descriptor)
        }
    }

    /// Container holding this node.
    #[must_use]
    pub fn container(&self) -> &str {
        match self {
            Self::Object(o) => &o.container,
            Self::Directory(d) => &d.container,
            Self::Symlink(s) => &s.container,
        }
    }

    /// Remote description of this node.
    #[must_use]
    pub fn descriptor(&self) -> &ObjectDescriptor {
        match self {
            Self::Object(o) => &o.descriptor,
            Self::Directory(d) => &d.descriptor,
            Self::Symlink(s) => &s.descriptor,
        }
    }

    /// Headers from the last metadata request.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        match self {
            Self::Object(o) => &o.headers,
            Self::Directory(d) => &d.headers,
            Self::Symlink(s) => &s.headers,
        }
    }

    /// Full object name of this node within its container.
    #[must_use]
    pub fn object_name(&self) -> &str {
        &self.descriptor().name
    }

    /// Whether this node is a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory(_))
    }
}
