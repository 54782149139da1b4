//! Read-only "view requests" page of an approver.

use std::collections::BTreeSet;

use derive_more::Display;
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use crate::model::leave_request::{LeaveListing, LeaveState};

pub mod render;

pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    All,
    ToApprove,
    SecondApproval,
    Approved,
}

impl StatusFilter {
    /// Unknown values behave as `all`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("to_approve") => StatusFilter::ToApprove,
            Some("second_approval") => StatusFilter::SecondApproval,
            Some("approved") => StatusFilter::Approved,
            _ => StatusFilter::All,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::ToApprove => "to_approve",
            StatusFilter::SecondApproval => "second_approval",
            StatusFilter::Approved => "approved",
        }
    }

    pub fn matches(self, state: LeaveState) -> bool {
        match self {
            StatusFilter::All => state != LeaveState::Cancelled,
            StatusFilter::ToApprove => state == LeaveState::ToApprove,
            StatusFilter::SecondApproval => state == LeaveState::SecondApproval,
            StatusFilter::Approved => state == LeaveState::Approved,
        }
    }
}

/// Raw query string of the view page. Everything stays textual so bad input
/// can be reported on the page instead of as a bare 400.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ViewQuery {
    /// Signed view token of the approver
    pub token: Option<String>,
    /// User id of the approver
    pub approver_id: Option<String>,
    /// all | to_approve | second_approval | approved
    pub status: Option<String>,
    /// Exact department name, or "all"
    pub department: Option<String>,
    /// Case-insensitive text search
    pub search: Option<String>,
    /// 1-based page number
    pub page: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewParams {
    pub token: String,
    pub approver_id: u64,
    pub status: StatusFilter,
    /// `None` means all departments.
    pub department: Option<String>,
    pub search: String,
    pub page: usize,
}

impl ViewParams {
    pub fn from_query(query: ViewQuery) -> Result<Self, ViewError> {
        let token = query
            .token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(ViewError::InvalidParameters)?;
        let approver_id = query
            .approver_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ViewError::InvalidParameters)?
            .parse::<u64>()
            .map_err(|_| ViewError::InvalidParameters)?;

        let page = match query.page.as_deref().map(str::trim) {
            None | Some("") => 1,
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| ViewError::InvalidParameters)?
                .max(1) as usize,
        };

        let department = query
            .department
            .filter(|d| !d.is_empty() && d != "all");

        Ok(Self {
            token,
            approver_id,
            status: StatusFilter::parse(query.status.as_deref()),
            department,
            search: query.search.unwrap_or_default().trim().to_string(),
            page,
        })
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ViewError {
    #[display(fmt = "Invalid parameters")]
    InvalidParameters,
    #[display(fmt = "Invalid or expired link")]
    InvalidLink,
    #[display(fmt = "Approver not found")]
    ApproverNotFound,
    #[display(fmt = "An error occurred while loading requests")]
    Internal,
}

impl std::error::Error for ViewError {}

#[derive(Debug, Clone, Serialize)]
pub struct ViewRow {
    pub id: u64,
    pub employee_name: String,
    pub department: String,
    pub leave_type: String,
    pub description: String,
    pub date_from: String,
    pub date_to: String,
    pub number_of_days: String,
    pub state: &'static str,
    pub state_label: &'static str,
}

impl From<LeaveListing> for ViewRow {
    fn from(l: LeaveListing) -> Self {
        Self {
            id: l.id,
            employee_name: l.employee_name,
            department: l.department.unwrap_or_default(),
            leave_type: l.leave_type,
            description: l.description.unwrap_or_default(),
            date_from: l.date_from.to_string(),
            date_to: l.date_to.to_string(),
            number_of_days: format_days(l.number_of_days),
            state: l.state.into(),
            state_label: l.state.label(),
        }
    }
}

/// One rendered page of the listing.
#[derive(Debug, Clone, Serialize)]
pub struct ViewPage {
    pub approver_id: u64,
    pub approver_name: String,
    pub token: String,
    pub status: StatusFilter,
    pub department: Option<String>,
    pub search: String,
    pub departments: Vec<String>,
    pub rows: Vec<ViewRow>,
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
    /// 1-based index of the first row shown, 0 when the page is empty.
    pub start: usize,
    pub end: usize,
}

impl ViewPage {
    pub fn prev_page(&self) -> Option<usize> {
        (self.page > 1).then(|| self.page - 1)
    }

    pub fn next_page(&self) -> Option<usize> {
        (self.page < self.total_pages).then(|| self.page + 1)
    }
}

fn format_days(days: f64) -> String {
    if days.fract() == 0.0 {
        format!("{days:.0}")
    } else {
        format!("{days:.1}")
    }
}

fn matches_search(listing: &LeaveListing, needle: &str) -> bool {
    let hit = |s: &str| s.to_lowercase().contains(needle);
    hit(&listing.employee_name)
        || hit(&listing.leave_type)
        || listing.description.as_deref().is_some_and(hit)
        || listing.department.as_deref().is_some_and(hit)
}

/// Filters, sorts and paginates the approver's listings.
pub fn build_page(
    mut listings: Vec<LeaveListing>,
    params: &ViewParams,
    approver_name: &str,
) -> ViewPage {
    let needle = params.search.to_lowercase();
    listings.retain(|l| params.status.matches(l.state));
    if !needle.is_empty() {
        listings.retain(|l| matches_search(l, &needle));
    }

    // collected before the department filter so every department stays selectable
    let departments: Vec<String> = listings
        .iter()
        .filter_map(|l| l.department.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    if let Some(department) = &params.department {
        listings.retain(|l| l.department.as_deref() == Some(department.as_str()));
    }
    listings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

    let total = listings.len();
    let total_pages = total.div_ceil(PAGE_SIZE);
    let offset = params.page.saturating_sub(1).saturating_mul(PAGE_SIZE);
    let rows: Vec<ViewRow> = listings
        .into_iter()
        .skip(offset)
        .take(PAGE_SIZE)
        .map(ViewRow::from)
        .collect();
    let (start, end) = if rows.is_empty() {
        (0, 0)
    } else {
        (offset + 1, offset + rows.len())
    };

    ViewPage {
        approver_id: params.approver_id,
        approver_name: approver_name.to_string(),
        token: params.token.clone(),
        status: params.status,
        department: params.department.clone(),
        search: params.search.clone(),
        departments,
        rows,
        page: params.page,
        total_pages,
        total,
        start,
        end,
    }
}
