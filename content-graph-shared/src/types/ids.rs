use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a string-backed identifier with the conversions every id needs.
macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_identifier!(
    /// Branch identity under which hierarchy and restriction rows are versioned.
    ContentStreamId
);
string_identifier!(
    /// Logical node identity, stable across dimension variants and forks.
    NodeAggregateId
);
string_identifier!(NodeTypeName);
string_identifier!(
    /// Edge label of a node below its parent.
    NodeName
);
string_identifier!(ReferenceName);
string_identifier!(PropertyName);
string_identifier!(
    /// Marker persisted by restriction hyperrelations. Disabling a node is
    /// tagging its subtree with [`SubtreeTag::disabled`].
    SubtreeTag
);

impl ContentStreamId {
    /// Mints a fresh, random content stream id.
    pub fn create() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl SubtreeTag {
    pub const DISABLED: &'static str = "disabled";

    pub fn disabled() -> Self {
        Self(Self::DISABLED.to_string())
    }

    pub fn is_disabled(&self) -> bool {
        self.0 == Self::DISABLED
    }
}
