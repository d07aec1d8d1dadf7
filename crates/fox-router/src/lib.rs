//! Pattern compiler, matcher and ordered route table for fox.
//!
//! This crate holds the request-independent half of routing: it turns route
//! patterns into compiled segments, matches them against request paths, and
//! keeps registered routes in per-method stacks in registration order.
//! Running handler chains is the job of `fox-core`.
//!
//! # Features
//!
//! - **Literal, parameter and wildcard segments**: `/users/:id`, `/:lang?/docs`, `/files/*`
//! - **Prefix matching** for middleware entries
//! - **Ordered stacks**: first registered match wins, no priority rules
//! - **HEAD from GET**: every `GET` route also serves `HEAD`
//! - **Allowed methods** for `405` and automatic `OPTIONS` replies
//! - **Span captures**: matching never copies path text
//!
//! # Example
//!
//! ```rust
//! use fox_router::{RouteTable, RoutingPolicy};
//! use http::Method;
//!
//! let policy = RoutingPolicy::default();
//! let mut table = RouteTable::new(policy);
//!
//! table.use_prefix("/api", vec!["auth"]).unwrap();
//! table.register("GET", "/api/users/:id", vec!["getUser"]).unwrap();
//!
//! let path = "/api/users/42";
//! let mut segments = Vec::new();
//! let mut captures = Vec::new();
//! policy.split_path(path, &mut segments);
//!
//! let chain: Vec<_> = table
//!     .stack(0)
//!     .iter()
//!     .filter(|route| route.matches(path, &segments, &mut captures))
//!     .flat_map(|route| route.handlers().iter().copied())
//!     .collect();
//! assert_eq!(chain, vec!["auth", "getUser"]);
//! assert_eq!(table.allowed_methods(path), vec![Method::GET, Method::HEAD]);
//! ```

#![doc(html_root_url = "https://docs.rs/fox-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod matcher;
mod method;
mod pattern;
mod policy;
mod route;
mod table;

pub use error::RouteError;
pub use matcher::MatchMode;
pub use method::{allow_header_value, method_index, parse_method, METHODS, METHOD_COUNT};
pub use pattern::{join_paths, Pattern, Segment, WILDCARD_NAME};
pub use policy::{RoutingPolicy, Span};
pub use route::{Route, RouteMethod};
pub use table::RouteTable;
