//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (at startup):
//!     "/users/:id" + handlers
//!     → pattern.rs (parse into literal / dynamic segments)
//!     → tree.rs (insert, splitting nodes on partial overlap)
//!     → router.rs (one tree per method, plus a wildcard tree)
//!
//! Incoming Request (method, path)
//!     → router.rs (pick the method's tree, then the wildcard tree)
//!     → tree.rs (walk prefixes, static children before dynamic)
//!     → matcher.rs (dynamic segments capture text)
//!     → Return: (handler chain, captures) or NoMatch
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Static text always wins over a dynamic segment at the same position
//! - Conflicting registrations fail instead of overwriting
//! - Captures are positional; names are kept next to the route

pub mod group;
pub mod matcher;
pub mod pattern;
pub mod router;
pub mod tree;

pub use group::Group;
pub use matcher::PrefixMatcher;
pub use router::{Route, RouteMatch, RouteMethod, Router};
pub use tree::{Match, Tree};
