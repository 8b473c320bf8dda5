// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use ticketsync_remote::FetchOptions;

use crate::engine::Synchronizer;
use crate::error::{RemoteContext, SyncError};

impl Synchronizer {
    /// Checks that a remote event can serve as a template.
    ///
    /// Returns the problems found; an empty list means the template is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the template cannot be fetched.
    #[tracing::instrument(skip(self))]
    pub async fn validate_template_event(&self, slug: &str) -> Result<Vec<String>, SyncError> {
        let event = self
            .client
            .event(slug)
            .await
            .context(|| format!("Cannot get template event {slug}"))?;

        let mut problems = Vec::new();
        if event.live {
            problems.push(format!("Template event {slug} must not be live"));
        }

        if event.has_subevents {
            let sub_events = self
                .client
                .sub_events(&event)
                .await
                .context(|| format!("Cannot get dates of template event {slug}"))?;
            if sub_events.len() != 1 {
                problems.push(format!(
                    "Template event {slug} must have exactly one date, found {}",
                    sub_events.len()
                ));
            }
        }

        let quotas = self
            .client
            .quotas(&event, &FetchOptions::all())
            .await
            .context(|| format!("Cannot get quotas of template event {slug}"))?;
        if quotas.len() != 1 {
            problems.push(format!(
                "Template event {slug} must have exactly one quota, found {}",
                quotas.len()
            ));
        }

        for problem in &problems {
            tracing::warn!(slug, %problem, "template event is not usable");
        }
        Ok(problems)
    }
}
