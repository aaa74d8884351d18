//! HTTP adapters exposing the engine to clients and admin tooling.

pub mod assessments_http;

pub use assessments_http::{
    AssessmentsHttpConfig, AssessmentsHttpServer, ErrorResponse, Subject, SubjectRole,
};
