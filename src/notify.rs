//! Modal and notification layer. At most one modal is shown at a time:
//! a notice, an edit form, or a delete confirmation.

use crate::edit::EditForm;
use crate::models::{RecordId, Resource};
use crate::render::escape;
use crate::sync::LiveTables;
use crate::tabs::Tab;
use axum::response::Redirect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

impl NoticeKind {
    pub fn key(self) -> &'static str {
        match self {
            NoticeKind::Success => "success",
            NoticeKind::Error => "error",
            NoticeKind::Info => "info",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        [NoticeKind::Success, NoticeKind::Error, NoticeKind::Info]
            .into_iter()
            .find(|kind| kind.key() == value)
    }

    pub fn title(self) -> &'static str {
        match self {
            NoticeKind::Success => "✅ Success",
            NoticeKind::Error => "❌ Error",
            NoticeKind::Info => "ℹ️ Information",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Error, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Info, message)
    }

    fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn from_query(kind: Option<&str>, message: Option<&str>) -> Option<Self> {
        let kind = NoticeKind::parse(kind?)?;
        Some(Self::new(kind, message.unwrap_or_default()))
    }

    /// Dashboard URL showing this notice on `tab`.
    pub fn url(&self, tab: Tab, extra: &[(&str, &str)]) -> String {
        let mut pairs = vec![("notice", self.kind.key()), ("message", self.message.as_str())];
        pairs.extend_from_slice(extra);
        tab.url(&pairs)
    }

    pub fn redirect(&self, tab: Tab, extra: &[(&str, &str)]) -> Redirect {
        Redirect::to(&self.url(tab, extra))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConfirmation {
    pub resource: Resource,
    pub id: RecordId,
    pub prompt: String,
}

impl DeleteConfirmation {
    /// Names the record from current table state; `None` when it is gone.
    pub fn lookup(tables: &LiveTables, resource: Resource, id: RecordId) -> Option<Self> {
        let subject = match resource {
            Resource::Buses => format!("bus {}", tables.bus(id)?.number),
            Resource::Drivers => format!("driver {}", tables.driver(id)?.name),
            Resource::Routes => format!("route \"{}\"", tables.route(id)?.name),
            Resource::Maintenance => {
                tables.maintenance_record(id)?;
                "this maintenance record".to_string()
            }
        };
        Some(Self {
            resource,
            id,
            prompt: format!("Are you sure you want to delete {subject}? This action cannot be undone."),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Modal {
    Notice(Notification),
    Edit(EditForm),
    ConfirmDelete(DeleteConfirmation),
}

impl Modal {
    pub fn render(&self, tab: Tab, busy: bool) -> String {
        let close = tab.url(&[]);
        match self {
            Modal::Notice(notice) => overlay(
                notice.kind.title(),
                &format!("<p>{}</p>", escape(&notice.message)),
                &format!(r#"<a class="btn-small btn-primary" href="{}">OK</a>"#, escape(&close)),
                &close,
            ),
            Modal::Edit(form) => {
                let form_id = form.form_id();
                overlay(
                    &form.title(),
                    &form.render(),
                    &format!(
                        r#"<a class="btn-small btn-muted" href="{}">Cancel</a>{}"#,
                        escape(&close),
                        submit_control(&form_id, "Save Changes", busy)
                    ),
                    &close,
                )
            }
            Modal::ConfirmDelete(confirm) => overlay(
                "⚠️ Confirm Delete",
                &format!(
                    r#"<p>{}</p><form id="confirmDeleteForm" method="post" action="/forms/{}/{}/delete"><input type="hidden" name="confirm" value="yes"></form>"#,
                    escape(&confirm.prompt),
                    confirm.resource.segment(),
                    confirm.id
                ),
                &format!(
                    r#"<a class="btn-small btn-muted" href="{}">Cancel</a>{}"#,
                    escape(&close),
                    submit_control("confirmDeleteForm", "Delete", busy)
                ),
                &close,
            ),
        }
    }
}

/// Submit button, disabled with a loading label while its form is in flight.
pub fn submit_control(form_id: &str, label: &str, busy: bool) -> String {
    if busy {
        format!(
            r#"<button type="submit" form="{form_id}" class="btn-small btn-primary" disabled><span class="loading"></span> Processing...</button>"#
        )
    } else {
        format!(r#"<button type="submit" form="{form_id}" class="btn-small btn-primary">{label}</button>"#)
    }
}

fn overlay(title: &str, body: &str, footer: &str, close_href: &str) -> String {
    format!(
        concat!(
            r#"<div class="modal-overlay active" data-close-href="{close}"><div class="modal">"#,
            r#"<div class="modal-header"><h3>{title}</h3><a class="modal-close" href="{close}">&times;</a></div>"#,
            r#"<div class="modal-body">{body}</div><div class="modal-footer">{footer}</div></div></div>"#
        ),
        close = escape(close_href),
        title = escape(title),
        body = body,
        footer = footer,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bus, BusStatus};

    #[test]
    fn notice_travels_through_the_query() {
        let notice = Notification::success("Attendance marked as Present for Asha");
        let url = notice.url(Tab::Drivers, &[("highlight", "7")]);
        assert!(url.starts_with("/?tab=drivers&notice=success&message=Attendance+marked"));
        assert!(url.ends_with("&highlight=7"));

        let parsed = Notification::from_query(Some("success"), Some(notice.message.as_str()));
        assert_eq!(parsed, Some(notice));
        assert_eq!(Notification::from_query(Some("warning"), Some("x")), None);
    }

    #[test]
    fn notice_modal_escapes_message() {
        let html = Modal::Notice(Notification::error("<script>alert(1)</script>"))
            .render(Tab::Buses, false);
        assert!(html.contains("❌ Error"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn delete_confirmation_names_the_record() {
        let mut tables = LiveTables::default();
        tables.buses.push(Bus {
            id: 3,
            number: "B12".into(),
            route_id: None,
            status: BusStatus::Active,
        });

        let confirm = DeleteConfirmation::lookup(&tables, Resource::Buses, 3).unwrap();
        assert_eq!(
            confirm.prompt,
            "Are you sure you want to delete bus B12? This action cannot be undone."
        );
        assert!(DeleteConfirmation::lookup(&tables, Resource::Buses, 4).is_none());

        let html = Modal::ConfirmDelete(confirm).render(Tab::Buses, false);
        assert!(html.contains(r#"action="/forms/buses/3/delete""#));
        assert!(html.contains(r#"name="confirm" value="yes""#));
    }

    #[test]
    fn busy_submit_is_disabled() {
        let html = submit_control("addBusForm", "Add Bus", true);
        assert!(html.contains("disabled"));
        assert!(html.contains("Processing..."));
    }
}
