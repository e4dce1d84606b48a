use crate::error::{FalconError, Result};
use crate::filters::OrderFilters;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A named orders-list query string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedView {
    pub name: String,
    pub query: String,
}

impl SavedView {
    pub fn filters(&self) -> OrderFilters {
        OrderFilters::from_query_string(&self.query)
    }
}

/// Saved views persisted as YAML next to the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SavedViews {
    #[serde(default)]
    pub views: Vec<SavedView>,
    #[serde(skip)]
    path: PathBuf,
}

impl SavedViews {
    pub fn load(path: &Path) -> Result<Self> {
        let mut views = if path.exists() {
            let data = std::fs::read_to_string(path)?;
            serde_yaml::from_str::<SavedViews>(&data)?
        } else {
            SavedViews::default()
        };
        views.path = path.to_path_buf();
        Ok(views)
    }

    fn persist(&self) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&self.path, data.as_bytes())
    }

    /// Store `filters` under `name`, replacing a view of the same name.
    pub fn save(&mut self, name: &str, filters: &OrderFilters) -> Result<&SavedView> {
        let view = SavedView {
            name: name.to_string(),
            query: filters.to_query_string(),
        };
        self.views.retain(|v| v.name != name);
        self.views.push(view);
        self.views.sort_by(|a, b| a.name.cmp(&b.name));
        self.persist()?;
        tracing::debug!(name, "saved view");
        self.get(name)
    }

    pub fn get(&self, name: &str) -> Result<&SavedView> {
        self.views
            .iter()
            .find(|v| v.name == name)
            .ok_or_else(|| FalconError::ViewNotFound(name.to_string()))
    }

    pub fn remove(&mut self, name: &str) -> Result<SavedView> {
        let idx = self
            .views
            .iter()
            .position(|v| v.name == name)
            .ok_or_else(|| FalconError::ViewNotFound(name.to_string()))?;
        let removed = self.views.remove(idx);
        self.persist()?;
        Ok(removed)
    }

    pub fn list(&self) -> Vec<&SavedView> {
        let mut out: Vec<&SavedView> = self.views.iter().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::AssigneeFilter;
    use crate::types::OrderStatus;
    use tempfile::TempDir;

    #[test]
    fn save_replace_and_remove() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("views.yaml");

        let mut views = SavedViews::load(&path).unwrap();
        let mine = OrderFilters {
            status: vec![OrderStatus::InReview],
            assignee: AssigneeFilter::Unassigned,
            ..Default::default()
        };
        views.save("triage", &mine).unwrap();
        views.save("all", &OrderFilters::default()).unwrap();

        let reloaded = SavedViews::load(&path).unwrap();
        let names: Vec<_> = reloaded.list().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["all", "triage"]);
        assert_eq!(reloaded.get("triage").unwrap().filters(), mine);

        views.save("triage", &OrderFilters::default()).unwrap();
        assert_eq!(views.list().len(), 2);
        assert_eq!(views.get("triage").unwrap().query, "");

        views.remove("all").unwrap();
        assert!(matches!(
            views.remove("all"),
            Err(FalconError::ViewNotFound(n)) if n == "all"
        ));
        assert_eq!(SavedViews::load(&path).unwrap().list().len(), 1);
    }
}
