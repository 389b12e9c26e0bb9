use crate::routes::Route;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardEntry {
    pub title: &'static str,
    pub description: &'static str,
    pub route: Route,
}

/// The dashboard cards, in display order
pub fn dashboard_entries() -> Vec<DashboardEntry> {
    vec![
        DashboardEntry {
            title: "Manage Items",
            description: "Add, edit, view and delete lost & found items",
            route: Route::Items,
        },
        DashboardEntry {
            title: "Manage Users",
            description: "View all registered users",
            route: Route::Users,
        },
        DashboardEntry {
            title: "Statistics",
            description: "View item counts by status",
            route: Route::Stats,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_lead_to_their_screens() {
        let entries: Vec<(&str, Route)> = dashboard_entries()
            .into_iter()
            .map(|e| (e.title, e.route))
            .collect();
        assert_eq!(
            entries,
            vec![
                ("Manage Items", Route::Items),
                ("Manage Users", Route::Users),
                ("Statistics", Route::Stats),
            ]
        );
        assert_eq!(Route::Stats.path(), "/stats");
    }
}
