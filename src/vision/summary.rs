// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Human-readable detection strings returned by `/detect`

use std::fmt;
use std::str::FromStr;

use super::detector::{Detection, GroupDetections};

/// Which text groups contribute to the textual summary
///
/// The annotated image always shows every group; this only affects the
/// `detections` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryScope {
    /// Only the last group of the request
    #[default]
    LastGroup,
    /// Every group, in request order
    AllGroups,
}

impl FromStr for SummaryScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "last-group" | "last" => Ok(Self::LastGroup),
            "all-groups" | "all" => Ok(Self::AllGroups),
            other => Err(format!(
                "unknown summary scope '{}', expected last-group or all-groups",
                other
            )),
        }
    }
}

impl fmt::Display for SummaryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LastGroup => write!(f, "last-group"),
            Self::AllGroups => write!(f, "all-groups"),
        }
    }
}

/// Format a single detection
///
/// Score has exactly three decimals, coordinates two.
pub fn format_detection(detection: &Detection, label: &str) -> String {
    let [x_min, y_min, x_max, y_max] = detection.bbox.to_array();
    format!(
        "Detected {} with confidence {:.3} at location [{:.2}, {:.2}, {:.2}, {:.2}]",
        label,
        detection.score.clamp(0.0, 1.0),
        x_min,
        y_min,
        x_max,
        y_max
    )
}

/// Build the summary list for a request
///
/// `groups` and `results` are parallel; a label index that falls outside its
/// group is reported as `unknown`.
pub fn build_summary(
    groups: &[Vec<String>],
    results: &[GroupDetections],
    scope: SummaryScope,
) -> Vec<String> {
    let pairs = groups.iter().zip(results.iter());

    let selected: Vec<(&Vec<String>, &GroupDetections)> = match scope {
        SummaryScope::LastGroup => pairs.last().into_iter().collect(),
        SummaryScope::AllGroups => pairs.collect(),
    };

    selected
        .into_iter()
        .flat_map(|(labels, detections)| {
            detections.iter().map(move |d| {
                let label = labels.get(d.label).map(String::as_str).unwrap_or("unknown");
                format_detection(d, label)
            })
        })
        .collect()
}
