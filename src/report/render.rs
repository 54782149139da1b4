use once_cell::sync::Lazy;
use serde::Serialize;
use tera::{Context, Tera};
use tracing::error;

use super::{StatusFilter, ViewError, ViewPage};

pub const VIEW_PATH: &str = "/leave/view_requests";

static TEMPLATES: Lazy<Tera> = Lazy::new(|| {
    let mut tera = Tera::default();
    if let Err(e) = tera.add_raw_templates(vec![
        (
            "view_requests.html",
            include_str!("../../templates/view_requests.html"),
        ),
        ("error.html", include_str!("../../templates/error.html")),
    ]) {
        error!(error = %e, "Failed to load view templates");
    }
    tera
});

#[derive(Serialize)]
struct Link {
    label: String,
    href: String,
    active: bool,
}

fn href(page: &ViewPage, status: StatusFilter, department: Option<&str>, page_no: Option<usize>) -> String {
    let mut href = format!(
        "{}?token={}&approver_id={}&status={}&department={}&search={}",
        VIEW_PATH,
        urlencoding::encode(&page.token),
        page.approver_id,
        status.as_str(),
        urlencoding::encode(department.unwrap_or("all")),
        urlencoding::encode(&page.search),
    );
    if let Some(n) = page_no {
        href.push_str(&format!("&page={n}"));
    }
    href
}

fn status_links(page: &ViewPage) -> Vec<Link> {
    [
        (StatusFilter::All, "All"),
        (StatusFilter::ToApprove, "To Approve"),
        (StatusFilter::SecondApproval, "Second Approval"),
        (StatusFilter::Approved, "Approved"),
    ]
    .into_iter()
    .map(|(status, label)| Link {
        label: label.to_string(),
        href: href(page, status, page.department.as_deref(), None),
        active: page.status == status,
    })
    .collect()
}

fn department_links(page: &ViewPage) -> Vec<Link> {
    let mut links = vec![Link {
        label: "All Departments".to_string(),
        href: href(page, page.status, None, None),
        active: page.department.is_none(),
    }];
    links.extend(page.departments.iter().map(|d| Link {
        label: d.clone(),
        href: href(page, page.status, Some(d), None),
        active: page.department.as_deref() == Some(d.as_str()),
    }));
    links
}

/// Renders the listing page; a template failure degrades to the error page.
pub fn render_page(page: &ViewPage) -> String {
    let mut ctx = Context::new();
    ctx.insert("page", page);
    ctx.insert("action", VIEW_PATH);
    ctx.insert("status", page.status.as_str());
    ctx.insert("department", page.department.as_deref().unwrap_or("all"));
    ctx.insert("status_links", &status_links(page));
    ctx.insert("department_links", &department_links(page));

    let dept = page.department.as_deref();
    ctx.insert(
        "prev_href",
        &page
            .prev_page()
            .map(|p| href(page, page.status, dept, Some(p)))
            .unwrap_or_default(),
    );
    ctx.insert(
        "next_href",
        &page
            .next_page()
            .map(|p| href(page, page.status, dept, Some(p)))
            .unwrap_or_default(),
    );

    match TEMPLATES.render("view_requests.html", &ctx) {
        Ok(html) => html,
        Err(e) => {
            error!(error = ?e, approver_id = page.approver_id, "Failed to render view page");
            render_error(ViewError::Internal)
        }
    }
}

pub fn render_error(err: ViewError) -> String {
    let message = err.to_string();
    let mut ctx = Context::new();
    ctx.insert("message", &message);

    TEMPLATES.render("error.html", &ctx).unwrap_or_else(|e| {
        error!(error = ?e, "Failed to render error page");
        format!(
            "<html><body><h1>{}</h1></body></html>",
            tera::escape_html(&message)
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ViewParams, ViewQuery, build_page};
    use crate::model::leave_request::{LeaveListing, LeaveState};
    use chrono::{NaiveDate, Utc};

    fn listing(id: u64, name: &str, dept: &str) -> LeaveListing {
        LeaveListing {
            id,
            employee_name: name.to_string(),
            department: Some(dept.to_string()),
            leave_type: "Annual".into(),
            description: None,
            date_from: NaiveDate::from_ymd_opt(2026, 2, 2).unwrap(),
            date_to: NaiveDate::from_ymd_opt(2026, 2, 3).unwrap(),
            number_of_days: 2.0,
            state: LeaveState::ToApprove,
            created_at: Utc::now(),
        }
    }

    fn page(listings: Vec<LeaveListing>, department: Option<&str>, page_no: &str) -> ViewPage {
        let params = ViewParams::from_query(ViewQuery {
            token: Some("abc".into()),
            approver_id: Some("7".into()),
            department: department.map(Into::into),
            search: Some("r&d".into()),
            page: Some(page_no.into()),
            ..Default::default()
        })
        .unwrap();
        build_page(listings, &params, "Mona <M>")
    }

    #[test]
    fn page_escapes_and_links_keep_filters() {
        let rows = vec![listing(1, "<script>x</script>", "R&D")];
        let html = render_page(&page(rows, Some("R&D"), "1"));

        assert!(html.contains("&lt;script&gt;x&lt;&#x2F;script&gt;"));
        assert!(!html.contains("<script>x"));
        assert!(html.contains("Mona &lt;M&gt;"));
        // href values are url-encoded, then html-escaped
        assert!(html.contains("department=R%26D"));
        assert!(html.contains("1-1 / 1"));
    }

    #[test]
    fn pager_links_only_when_pages_exist() {
        let rows: Vec<_> = (1..=15).map(|i| listing(i, "Erin", "R&D")).collect();
        let first = render_page(&page(rows.clone(), None, "1"));
        assert!(first.contains("page=2"));
        assert!(!first.contains("page=0"));

        let second = render_page(&page(rows, None, "2"));
        assert!(second.contains("page=1"));
        assert!(second.contains("11-15 / 15"));
    }

    #[test]
    fn empty_listing_says_so() {
        let html = render_page(&page(vec![], None, "1"));
        assert!(html.contains("No leave requests found"));
    }

    #[test]
    fn error_page_shows_message() {
        let html = render_error(ViewError::InvalidLink);
        assert!(html.contains("Invalid or expired link"));
    }
}
