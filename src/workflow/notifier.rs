use std::sync::Arc;

use tera::{Context, Tera};
use tracing::{error, info, warn};

use crate::mail::{MailQueue, TemplateProvider};
use crate::model::employee::Employee;
use crate::model::leave_request::{LeaveRequest, LeaveState};
use crate::model::mail::OutgoingMail;
use crate::repository::{DirectoryRepository, RepositoryError};
use crate::utils::token::TokenSigner;

use super::guard::Actor;

/// Template key and fallback subject of the notice sent on entering `state`.
pub fn notice_for(state: LeaveState) -> Option<(&'static str, &'static str)> {
    match state {
        LeaveState::ToApprove => Some(("leave_first_approval", "Leave Approval Required")),
        LeaveState::SecondApproval => Some(("leave_second_approval", "Second Approval Needed")),
        LeaveState::Approved => Some(("leave_final_approval", "Leave Approved")),
        LeaveState::Refused => Some(("leave_refusal", "Leave Refused")),
        LeaveState::Cancelled => Some(("leave_cancelled", "Leave Cancelled")),
        LeaveState::ToSubmit => None,
    }
}

pub fn fallback_body(employee_name: &str) -> String {
    format!("<p>Leave request for {}</p>", tera::escape_html(employee_name))
}

#[derive(Debug, Clone, PartialEq)]
struct Recipient {
    name: String,
    email: String,
    /// Set for approvers; they get a link to their request listing.
    approver_id: Option<u64>,
}

/// Sends one notice per recipient whenever a leave changes state.
pub struct Notifier {
    directory: Arc<dyn DirectoryRepository>,
    templates: Arc<dyn TemplateProvider>,
    queue: Arc<dyn MailQueue>,
    signer: TokenSigner,
    default_from: String,
    public_base_url: String,
}

impl Notifier {
    pub fn new(
        directory: Arc<dyn DirectoryRepository>,
        templates: Arc<dyn TemplateProvider>,
        queue: Arc<dyn MailQueue>,
        signer: TokenSigner,
        default_from: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            templates,
            queue,
            signer,
            default_from: default_from.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Link to the approver's read-only listing, signed for that approver.
    pub fn view_url(&self, approver_id: u64) -> String {
        format!(
            "{}/leave/view_requests?token={}&approver_id={}",
            self.public_base_url,
            urlencoding::encode(&self.signer.view_token(approver_id)),
            approver_id
        )
    }

    /// Queues the notice for the leave's current state.
    /// Returns the number of queued messages; failures are logged, never returned.
    pub async fn dispatch(&self, leave: &LeaveRequest, actor: &Actor) -> usize {
        let Some((template_key, fallback_subject)) = notice_for(leave.state) else {
            return 0;
        };

        let mails = match self
            .compose(leave, actor, template_key, fallback_subject)
            .await
        {
            Ok(mails) => mails,
            Err(e) => {
                error!(leave_id = leave.id, error = %e, "Failed to prepare leave notification");
                return 0;
            }
        };

        let mut queued = 0;
        for mail in mails {
            let to = mail.email_to.clone();
            match self.queue.enqueue(mail).await {
                Ok(mail_id) => {
                    queued += 1;
                    info!(leave_id = leave.id, mail_id, to = %to, template_key, "Leave notification queued");
                }
                Err(e) => {
                    error!(leave_id = leave.id, to = %to, error = %e, "Failed to queue leave notification");
                }
            }
        }
        queued
    }

    async fn compose(
        &self,
        leave: &LeaveRequest,
        actor: &Actor,
        template_key: &str,
        fallback_subject: &str,
    ) -> Result<Vec<OutgoingMail>, RepositoryError> {
        let Some(employee) = self.directory.find_employee(leave.employee_id).await? else {
            warn!(leave_id = leave.id, "Leave employee not found, notification skipped");
            return Ok(Vec::new());
        };

        let recipients = self.recipients(leave, &employee).await?;
        if recipients.is_empty() {
            return Ok(Vec::new());
        }

        let leave_type = self
            .directory
            .find_leave_type(leave.leave_type_id)
            .await?
            .map(|t| t.name)
            .unwrap_or_default();

        let email_from = self
            .directory
            .find_user(actor.user_id)
            .await?
            .and_then(|u| u.email)
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| self.default_from.clone());

        let template = match self.templates.find_template(template_key).await {
            Ok(t) => t,
            Err(e) => {
                warn!(template_key, error = %e, "Template lookup failed, using fallback message");
                None
            }
        };

        let mails = recipients
            .into_iter()
            .map(|recipient| {
                let mut ctx = Context::new();
                ctx.insert("employee_name", &employee.name);
                ctx.insert("approver_name", &recipient.name);
                ctx.insert("leave_type", &leave_type);
                ctx.insert("date_from", &leave.date_from.to_string());
                ctx.insert("date_to", &leave.date_to.to_string());
                ctx.insert("number_of_days", &leave.number_of_days);
                ctx.insert("description", leave.description.as_deref().unwrap_or(""));
                ctx.insert("state", leave.state.label());
                ctx.insert(
                    "view_url",
                    &recipient
                        .approver_id
                        .map(|id| self.view_url(id))
                        .unwrap_or_default(),
                );

                let rendered = template.as_ref().and_then(|t| {
                    let subject = Tera::one_off(&t.subject, &ctx, false);
                    let body = Tera::one_off(&t.body_html, &ctx, true);
                    match (subject, body) {
                        (Ok(s), Ok(b)) => Some((s, b)),
                        (Err(e), _) | (_, Err(e)) => {
                            warn!(template_key, error = %e, "Template render failed, using fallback message");
                            None
                        }
                    }
                });
                let (subject, body_html) = rendered.unwrap_or_else(|| {
                    (fallback_subject.to_string(), fallback_body(&employee.name))
                });

                OutgoingMail {
                    email_from: email_from.clone(),
                    email_to: recipient.email,
                    subject,
                    body_html,
                }
            })
            .collect();

        Ok(mails)
    }

    async fn recipients(
        &self,
        leave: &LeaveRequest,
        employee: &Employee,
    ) -> Result<Vec<Recipient>, RepositoryError> {
        let approver_ids: Vec<u64> = match leave.state {
            LeaveState::ToApprove | LeaveState::Cancelled => leave.first_approver_id.into_iter().collect(),
            LeaveState::SecondApproval if leave.second_approver_ids.is_empty() => {
                leave.first_approver_id.into_iter().collect()
            }
            LeaveState::SecondApproval => leave.second_approver_ids.clone(),
            LeaveState::Approved | LeaveState::Refused => {
                return Ok(match employee.notification_email() {
                    Some(email) => vec![Recipient {
                        name: employee.name.clone(),
                        email: email.to_string(),
                        approver_id: None,
                    }],
                    None => {
                        warn!(leave_id = leave.id, employee_id = employee.id, "Employee has no email address");
                        Vec::new()
                    }
                });
            }
            LeaveState::ToSubmit => Vec::new(),
        };

        if approver_ids.is_empty() {
            warn!(leave_id = leave.id, state = %leave.state, "No approver to notify");
            return Ok(Vec::new());
        }

        let users = self.directory.find_users(&approver_ids).await?;
        let recipients = approver_ids
            .iter()
            .filter_map(|id| {
                let user = users.iter().find(|u| u.id == *id)?;
                match user.email.as_deref().filter(|e| !e.trim().is_empty()) {
                    Some(email) => Some(Recipient {
                        name: user.name.clone(),
                        email: email.to_string(),
                        approver_id: Some(user.id),
                    }),
                    None => {
                        warn!(leave_id = leave.id, user_id = user.id, "Approver has no email address");
                        None
                    }
                }
            })
            .collect();
        Ok(recipients)
    }
}
