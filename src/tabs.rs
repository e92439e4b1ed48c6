use crate::models::Resource;
use crate::render::escape;
use url::form_urlencoded;

/// Dashboard panels; exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Overview,
    Buses,
    Drivers,
    Routes,
    Maintenance,
    Predictions,
}

impl Tab {
    pub const ALL: [Tab; 6] = [
        Tab::Overview,
        Tab::Buses,
        Tab::Drivers,
        Tab::Routes,
        Tab::Maintenance,
        Tab::Predictions,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Tab::Overview => "overview",
            Tab::Buses => "buses",
            Tab::Drivers => "drivers",
            Tab::Routes => "routes",
            Tab::Maintenance => "maintenance",
            Tab::Predictions => "predictions",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Buses => "Buses",
            Tab::Drivers => "Drivers",
            Tab::Routes => "Routes",
            Tab::Maintenance => "Maintenance",
            Tab::Predictions => "AI Predictions",
        }
    }

    fn icon(self) -> &'static str {
        match self {
            Tab::Overview => "📊",
            Tab::Buses => "🚌",
            Tab::Drivers => "👤",
            Tab::Routes => "🗺️",
            Tab::Maintenance => "🔧",
            Tab::Predictions => "🤖",
        }
    }

    /// Unknown or missing selections fall back to the overview.
    pub fn parse(value: Option<&str>) -> Tab {
        value
            .and_then(|key| Tab::ALL.into_iter().find(|tab| tab.key() == key.trim()))
            .unwrap_or_default()
    }

    pub fn for_resource(resource: Resource) -> Tab {
        match resource {
            Resource::Buses => Tab::Buses,
            Resource::Drivers => Tab::Drivers,
            Resource::Routes => Tab::Routes,
            Resource::Maintenance => Tab::Maintenance,
        }
    }

    /// Dashboard URL selecting this tab, with extra query pairs appended.
    pub fn url(self, extra: &[(&str, &str)]) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("tab", self.key());
        for (key, value) in extra {
            query.append_pair(key, value);
        }
        format!("/?{}", query.finish())
    }
}

pub fn render_sidebar(active: Tab) -> String {
    Tab::ALL
        .into_iter()
        .map(|tab| {
            let class = if tab == active { " class=\"active\"" } else { "" };
            format!(
                r#"<li{class} data-tab="{key}"><a href="{href}"><span class="icon">{icon}</span>{title}</a></li>"#,
                key = tab.key(),
                href = escape(&tab.url(&[])),
                icon = tab.icon(),
                title = tab.title(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_falls_back_to_overview() {
        assert_eq!(Tab::parse(Some("drivers")), Tab::Drivers);
        assert_eq!(Tab::parse(Some("live")), Tab::Overview);
        assert_eq!(Tab::parse(None), Tab::Overview);
    }

    #[test]
    fn url_encodes_extra_pairs() {
        let url = Tab::Drivers.url(&[("notice", "success"), ("message", "Marked Asha & co")]);
        assert_eq!(
            url,
            "/?tab=drivers&notice=success&message=Marked+Asha+%26+co"
        );
    }

    #[test]
    fn sidebar_marks_single_active_tab() {
        let html = render_sidebar(Tab::Routes);
        assert_eq!(html.matches("class=\"active\"").count(), 1);
        assert!(html.contains(r#"<li class="active" data-tab="routes">"#));
    }
}
