//! HTTP surface: routes, handlers, DTOs.
//!
//! | Module     | Responsibility                                   |
//! |------------|---------------------------------------------------|
//! | `dto`      | Request/response shapes, `validator` rules        |
//! | `handlers` | Extractors → service calls → responses            |
//! | `routes`   | `web::ServiceConfig` wiring and role guards        |

pub mod dto;
pub mod handlers;
pub mod routes;
