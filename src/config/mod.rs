// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod detect;

pub use detect::{parse_cors_origins, ConfigError, DetectConfig, DEFAULT_CORS_ORIGINS};
