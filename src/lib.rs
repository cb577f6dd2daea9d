// Device identities, classes and action tokens
pub mod device;

// Status records, persistence and liveness
pub mod status;

// Single-slot pending actions per target
pub mod mailbox;

// Process-wide policy toggles
pub mod policy;

// Operator summaries, door snapshot and SpaceAPI view
pub mod aggregate;

// Shared relay state and device polls
pub mod relay;

// Chat command dispatch
pub mod command;

// Chat and device credential checks
pub mod auth;

// Configuration and secrets
pub mod config;

// Outbound chat notifications
pub mod notify;

// Device log files
pub mod devlog;

// HTTP routers
pub mod api;
