use std::env;
use std::path::PathBuf;

use crate::render::{GraphOptions, MAX_DIMENSION};
use crate::schema::ColumnSchema;

/// Runtime settings of the dashboard server
#[derive(Clone, Debug, PartialEq)]
pub struct DashboardConfig {
    pub bind_addr: String,
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub cors: bool,
    pub chart_width: u32,
    pub chart_height: u32,
    pub columns: ColumnSchema,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            static_dir: PathBuf::from("static"),
            max_upload_bytes: 10 * 1024 * 1024,
            cors: false,
            chart_width: 800,
            chart_height: 600,
            columns: ColumnSchema::default(),
        }
    }
}

impl DashboardConfig {
    /// Reads `DASHBOARD_*` variables from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source; unset or unparsable
    /// values fall back to the defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let vars = EnvVars { lookup };
        let columns = ColumnSchema {
            project: vars.string("DASHBOARD_COLUMN_PROJECT", defaults.columns.project),
            department: vars.string("DASHBOARD_COLUMN_DEPARTMENT", defaults.columns.department),
            manager: vars.string("DASHBOARD_COLUMN_MANAGER", defaults.columns.manager),
            schedule_status: vars.string(
                "DASHBOARD_COLUMN_SCHEDULE_STATUS",
                defaults.columns.schedule_status,
            ),
            work_status: vars.string("DASHBOARD_COLUMN_WORK_STATUS", defaults.columns.work_status),
            cost_status: vars.string("DASHBOARD_COLUMN_COST_STATUS", defaults.columns.cost_status),
        };

        Self {
            bind_addr: vars.string("DASHBOARD_BIND_ADDR", defaults.bind_addr),
            static_dir: vars
                .get("DASHBOARD_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            max_upload_bytes: vars.usize("DASHBOARD_MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
            cors: vars.bool("DASHBOARD_CORS", defaults.cors),
            chart_width: vars.dimension("DASHBOARD_CHART_WIDTH", defaults.chart_width),
            chart_height: vars.dimension("DASHBOARD_CHART_HEIGHT", defaults.chart_height),
            columns,
        }
    }

    pub fn graph_options(&self) -> GraphOptions {
        GraphOptions {
            width: self.chart_width,
            height: self.chart_height,
        }
    }
}

struct EnvVars<F> {
    lookup: F,
}

impl<F> EnvVars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn string(&self, name: &str, default: String) -> String {
        self.get(name).unwrap_or(default)
    }

    fn bool(&self, name: &str, default: bool) -> bool {
        self.get(name)
            .and_then(|v| match v.as_str() {
                "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
                "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
                _ => None,
            })
            .unwrap_or(default)
    }

    fn usize(&self, name: &str, default: usize) -> usize {
        self.get(name)
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(default)
    }

    /// Chart side in pixels, accepted only within `1..=MAX_DIMENSION`
    fn dimension(&self, name: &str, default: u32) -> u32 {
        self.get(name)
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|v| (1..=MAX_DIMENSION).contains(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> DashboardConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DashboardConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_without_variables() {
        assert_eq!(config(&[]), DashboardConfig::default());
    }

    #[test]
    fn variables_override_defaults() {
        let cfg = config(&[
            ("DASHBOARD_BIND_ADDR", "0.0.0.0:8080"),
            ("DASHBOARD_STATIC_DIR", "/srv/static"),
            ("DASHBOARD_MAX_UPLOAD_BYTES", "1024"),
            ("DASHBOARD_CORS", "yes"),
            ("DASHBOARD_CHART_WIDTH", "640"),
            ("DASHBOARD_COLUMN_MANAGER", "Project Manager"),
        ]);
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.static_dir, PathBuf::from("/srv/static"));
        assert_eq!(cfg.max_upload_bytes, 1024);
        assert!(cfg.cors);
        assert_eq!(cfg.graph_options().width, 640);
        assert_eq!(cfg.graph_options().height, 600);
        assert_eq!(cfg.columns.manager, "Project Manager");
        assert_eq!(cfg.columns.project, "Nome do Projeto");
    }

    #[test]
    fn invalid_values_fall_back() {
        let cfg = config(&[
            ("DASHBOARD_MAX_UPLOAD_BYTES", "lots"),
            ("DASHBOARD_CORS", "maybe"),
            ("DASHBOARD_CHART_HEIGHT", "0"),
            ("DASHBOARD_BIND_ADDR", "   "),
        ]);
        assert_eq!(cfg, DashboardConfig::default());
    }

    #[test]
    fn oversized_chart_dimensions_fall_back() {
        let cfg = config(&[
            ("DASHBOARD_CHART_WIDTH", "40000"),
            ("DASHBOARD_CHART_HEIGHT", "40000"),
        ]);
        assert_eq!(cfg.chart_width, 800);
        assert_eq!(cfg.chart_height, 600);

        let cfg = config(&[("DASHBOARD_CHART_WIDTH", "4096")]);
        assert_eq!(cfg.chart_width, MAX_DIMENSION);
    }
}
