//! # Exit Codes
//!
//! Stable process exit codes, one per failure class, so calling automation
//! can tell failures apart without parsing text.
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Success |
//! | 1 | General error |
//! | 2 | Invalid command-line usage (handled by clap) |
//! | 10 | A required variable is missing or malformed |
//! | 11 | A required tool is not installed |
//! | 12 | A profile-dependent input (e.g. stunnel material) is missing |
//! | 20 | A download failed or produced an empty file |
//! | 21 | The remote rejected the supplied credentials |
//! | 22 | The source spec is malformed or unsupported |
//! | 23 | The requested file does not exist in the repository |
//! | 30 | A fetched artifact failed a structural check |
//! | 31 | The compose manifest failed validation |
//! | 40 | Building images failed |
//! | 41 | Starting the stack failed |
//! | 42 | Inspecting existing containers failed |
//! | 50 | The operator declined a confirmation |
//! | 60 | The change watcher could not be set up |

pub const SUCCESS: i32 = 0;
pub const GENERAL_ERROR: i32 = 1;
pub const USAGE: i32 = 2;

pub const MISSING_VARIABLE: i32 = 10;
pub const MISSING_TOOL: i32 = 11;
pub const MISSING_PROFILE_INPUT: i32 = 12;

pub const DOWNLOAD_FAILED: i32 = 20;
pub const AUTH_REJECTED: i32 = 21;
pub const INVALID_SOURCE: i32 = 22;
pub const MISSING_REPO_FILE: i32 = 23;

pub const INVALID_ARTIFACT: i32 = 30;
pub const MANIFEST_INVALID: i32 = 31;

pub const BUILD_FAILED: i32 = 40;
pub const START_FAILED: i32 = 41;
pub const RUNTIME_FAILED: i32 = 42;

pub const DECLINED: i32 = 50;

pub const WATCH_FAILED: i32 = 60;
