//! Moderation state for one admin session: the current listing, the query it
//! was fetched with and the ids picked for a bulk action.

use std::{collections::BTreeSet, fmt::Write as _};

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};

use libs::{
    ApiClient,
    models::{ListQuery, ModerationAction, StatusFilter, Upload, UploadStatus},
};

/// What an admin can do to a single upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemAction {
    Approve,
    Reject,
    /// Optionally at a given time, otherwise the server picks.
    Schedule(Option<DateTime<Utc>>),
    /// Take a scheduled upload live now.
    Activate,
    Delete,
}

impl ItemAction {
    fn name(&self) -> &'static str {
        match self {
            ItemAction::Approve => "approve",
            ItemAction::Reject => "reject",
            ItemAction::Schedule(_) => "schedule",
            ItemAction::Activate => "activate",
            ItemAction::Delete => "delete",
        }
    }
}

/// Actions offered for an upload in `status`.
pub fn actions_for(status: UploadStatus) -> &'static [&'static str] {
    match status {
        UploadStatus::Pending => &["approve", "reject", "schedule"],
        UploadStatus::Scheduled => &["activate"],
        _ => &["delete"],
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub all: usize,
    pub pending: usize,
    pub approved: usize,
    pub scheduled: usize,
    pub rejected: usize,
}

impl Counts {
    pub fn get(&self, status: UploadStatus) -> usize {
        match status {
            UploadStatus::Pending => self.pending,
            UploadStatus::Approved => self.approved,
            UploadStatus::Scheduled => self.scheduled,
            UploadStatus::Rejected => self.rejected,
        }
    }
}

pub struct Panel {
    client: ApiClient,
    pub query: ListQuery,
    uploads: Vec<Upload>,
    total: u64,
    total_pages: u64,
    selection: BTreeSet<String>,
}

impl Panel {
    pub fn new(client: ApiClient, query: ListQuery) -> Self {
        Self {
            client,
            query,
            uploads: Vec::new(),
            total: 0,
            total_pages: 0,
            selection: BTreeSet::new(),
        }
    }

    /// Re-fetch the listing. On failure the previous listing stays.
    pub async fn refresh(&mut self) -> Result<()> {
        let listing = self.client.list_uploads(&self.query).await?;
        self.total = listing.total();
        self.total_pages = listing.total_pages();
        self.uploads = listing.into_uploads();
        Ok(())
    }

    pub fn counts(&self) -> Counts {
        let mut counts = Counts {
            all: self.uploads.len(),
            ..Counts::default()
        };
        for upload in &self.uploads {
            match upload.status {
                UploadStatus::Pending => counts.pending += 1,
                UploadStatus::Approved => counts.approved += 1,
                UploadStatus::Scheduled => counts.scheduled += 1,
                UploadStatus::Rejected => counts.rejected += 1,
            }
        }
        counts
    }

    pub fn filtered(&self, filter: StatusFilter) -> Vec<&Upload> {
        self.uploads
            .iter()
            .filter(|u| match filter {
                StatusFilter::All => true,
                StatusFilter::Only(status) => u.status == status,
            })
            .collect()
    }

    pub fn selection(&self) -> &BTreeSet<String> {
        &self.selection
    }

    pub fn select(&mut self, id: impl Into<String>) {
        self.selection.insert(id.into());
    }

    /// Select every loaded upload passing `filter`.
    pub fn select_filtered(&mut self, filter: StatusFilter) {
        let ids: Vec<String> = self.filtered(filter).iter().map(|u| u.id.clone()).collect();
        self.selection.extend(ids);
    }

    /// Send one moderation command, then re-fetch. Actions that do not apply
    /// to an upload in the loaded listing are refused without a request.
    pub async fn item_action(&mut self, id: &str, action: ItemAction) -> Result<()> {
        if let Some(upload) = self.uploads.iter().find(|u| u.id == id) {
            if !actions_for(upload.status).contains(&action.name()) {
                bail!("cannot {} an upload that is {}", action.name(), upload.status);
            }
        }

        let sent = match action {
            ItemAction::Approve | ItemAction::Activate => {
                self.client.moderate(id, ModerationAction::Approve).await
            }
            ItemAction::Reject => self.client.moderate(id, ModerationAction::Reject).await,
            ItemAction::Schedule(None) => {
                self.client.moderate(id, ModerationAction::Schedule).await
            }
            ItemAction::Schedule(Some(at)) => self.client.schedule(id, at).await,
            ItemAction::Delete => self.client.delete_upload(id).await,
        };
        match sent {
            Ok(()) => {}
            // someone else deleted it meanwhile
            Err(e) if e.is_not_found() => {
                self.selection.remove(id);
                self.refresh().await?;
                bail!("no upload with id {id}");
            }
            Err(e) => return Err(e.into()),
        }
        tracing::info!(%id, action = action.name(), "upload moderated");

        self.selection.remove(id);
        self.refresh().await
    }

    /// Apply `action` to the whole selection in one request. Returns `false`
    /// when nothing was selected. The selection survives a failed request.
    pub async fn bulk_action(&mut self, action: ModerationAction) -> Result<bool> {
        if self.selection.is_empty() {
            return Ok(false);
        }
        let ids: Vec<String> = self.selection.iter().cloned().collect();
        self.client.bulk(&ids, action).await?;
        tracing::info!(count = ids.len(), %action, "bulk moderation applied");

        self.selection.clear();
        self.refresh().await?;
        Ok(true)
    }

    pub fn summary(&self) -> String {
        let counts = self.counts();
        let mut out = format!("All {}", counts.all);
        for status in UploadStatus::ALL {
            let _ = write!(out, " | {} {}", capitalize(status.as_str()), counts.get(status));
        }
        if self.total_pages > 1 {
            let page = self.query.page.unwrap_or(1);
            let _ = write!(out, " (page {page}/{}, {} total)", self.total_pages, self.total);
        }
        out
    }

    /// One line per upload passing `filter`.
    pub fn table(&self, filter: StatusFilter) -> String {
        let rows = self.filtered(filter);
        if rows.is_empty() {
            return "No uploads found".to_string();
        }
        let mut out = String::new();
        for u in rows {
            let mark = if self.selection.contains(&u.id) { '*' } else { ' ' };
            let _ = writeln!(
                out,
                "{mark} {:<26} {:<9} {:<14} {:<3} {:<30} {}",
                u.id,
                u.status.as_str().to_uppercase(),
                u.created_at.format("%b %-d, %H:%M"),
                if u.displayed { "yes" } else { "no" },
                snippet(u.text().unwrap_or("-"), 30),
                actions_for(u.status).join("/"),
            );
        }
        out
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn snippet(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.replace('\n', " ");
    }
    let cut: String = text.chars().take(max - 1).collect();
    format!("{}…", cut.replace('\n', " "))
}
