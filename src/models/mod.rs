//! Core data models: tool parameters, session options, and backend payloads.

pub mod jobs;
pub mod params;
pub mod profile;
pub mod schema;
pub mod session;

pub use jobs::{
    AgentTaskData, AgentTaskRequest, AgentTaskResponse, CrawlJobResponse, CrawlRequest,
    CrawledPage, ExtractJobResponse, ExtractRequest, JobStatus, JobStatusResponse, ScrapeData,
    ScrapeJobResponse, ScrapeOptions, ScrapeRequest, StartJobResponse,
};
pub use params::{
    AgentTaskParams, CrawlParams, DeleteProfileParams, ExtractParams, ListProfilesParams,
    OutputFormats, ParamError, ScrapeParams,
};
pub use profile::{CreateProfileResponse, ProfileListResponse, ProfileSummary};
pub use schema::{is_valid_json_schema, parse_schema, resolve_extraction_schema, SchemaError};
pub use session::SessionOptions;
