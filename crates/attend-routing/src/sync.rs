// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead/attendance reconciliation.
//!
//! Every non-terminal lead must have exactly one non-closed attendance.
//! Sync walks a tenant's leads in id order, one batch per transaction, and
//! creates the missing attendances. It is safe to run concurrently with
//! claims and with itself.

use attend_core::{AttendError, Attendance, EventType, Lead, SyncReport};
use attend_storage::EnsureOutcome;
use attend_storage::queries::attendances;
use tracing::{debug, info};

use crate::engine::RoutingEngine;

impl RoutingEngine {
    fn is_terminal_lead(&self, lead: &Lead) -> bool {
        let status = lead.status.trim().to_lowercase();
        self.settings
            .terminal_lead_statuses
            .iter()
            .any(|terminal| *terminal == status)
    }

    /// Reconcile one tenant.
    pub async fn sync(&self, tenant_id: &str) -> Result<SyncReport, AttendError> {
        let batch_size = self.settings.sync_batch_size.max(1);
        let mut report = SyncReport::default();
        let mut after: Option<String> = None;

        loop {
            let page = self
                .leads
                .list_leads(tenant_id, after.as_deref(), batch_size)
                .await?;
            let Some(last) = page.last() else {
                break;
            };
            after = Some(last.id.clone());
            let full_page = page.len() == batch_size;

            report.total_leads += page.len() as u64;
            let mut lead_ids = Vec::with_capacity(page.len());
            for lead in &page {
                if self.is_terminal_lead(lead) {
                    report.skipped_terminal += 1;
                } else {
                    lead_ids.push(lead.id.clone());
                }
            }

            if !lead_ids.is_empty() {
                let outcomes = self
                    .settings
                    .retry
                    .run("sync", || {
                        attendances::ensure_open_batch(
                            &self.db,
                            tenant_id,
                            lead_ids.clone(),
                            self.settings.default_priority,
                        )
                    })
                    .await?;

                for outcome in outcomes {
                    match outcome {
                        EnsureOutcome::Created(attendance) => {
                            report.created_attendances += 1;
                            let attendance = self.present(attendance);
                            debug!(
                                tenant_id,
                                attendance_id = %attendance.id,
                                lead_id = %attendance.lead_id,
                                "attendance created by sync"
                            );
                            self.emit(EventType::New, None, &attendance);
                        }
                        EnsureOutcome::Existing(_) => report.existing_attendances += 1,
                    }
                }
            }

            if !full_page {
                break;
            }
        }

        info!(
            tenant_id,
            total_leads = report.total_leads,
            created = report.created_attendances,
            existing = report.existing_attendances,
            skipped_terminal = report.skipped_terminal,
            "sync complete"
        );
        Ok(report)
    }

    /// Reconcile a single lead right after ingestion touched it.
    ///
    /// Returns the lead's non-closed attendance, or `None` for a terminal lead.
    pub async fn sync_lead(
        &self,
        tenant_id: &str,
        lead_id: &str,
    ) -> Result<Option<Attendance>, AttendError> {
        let lead = self
            .leads
            .get_lead(tenant_id, lead_id)
            .await?
            .ok_or_else(|| AttendError::not_found("lead", lead_id))?;
        if self.is_terminal_lead(&lead) {
            debug!(tenant_id, lead_id, status = %lead.status, "terminal lead, nothing to sync");
            return Ok(None);
        }

        let outcome = self
            .settings
            .retry
            .run("sync_lead", || {
                attendances::create_open(
                    &self.db,
                    tenant_id,
                    lead_id,
                    None,
                    self.settings.default_priority,
                )
            })
            .await?;
        Ok(Some(match outcome {
            EnsureOutcome::Created(attendance) => {
                let attendance = self.present(attendance);
                info!(tenant_id, lead_id, attendance_id = %attendance.id, "attendance created for lead");
                self.emit(EventType::New, None, &attendance);
                attendance
            }
            EnsureOutcome::Existing(attendance) => self.present(attendance),
        }))
    }

    /// Reconcile every tenant that has leads.
    pub async fn sync_all(&self) -> Result<SyncReport, AttendError> {
        let mut total = SyncReport::default();
        for tenant_id in self.leads.list_tenants().await? {
            total.merge(self.sync(&tenant_id).await?);
        }
        Ok(total)
    }
}
