//! Recipe Catalog (C11): the consumed interface Tier-1 and Tier-2 use to
//! resolve a recipe UUID into its descriptor. `RecipeDirectory` is the
//! production implementation, backed by one JSON file per recipe under a
//! directory; `InMemoryRecipes` is for tests.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::DeploymentRecipe;

#[async_trait]
pub trait RecipeCatalog: Send + Sync {
    async fn from_uuid(&self, uuid: Uuid) -> Result<DeploymentRecipe>;
}

/// Reads `{recipes_dir}/{uuid}.json`, each a `DeploymentRecipe` descriptor.
pub struct RecipeDirectory {
    recipes_dir: PathBuf,
}

impl RecipeDirectory {
    pub fn new(recipes_dir: impl Into<PathBuf>) -> Self {
        Self {
            recipes_dir: recipes_dir.into(),
        }
    }

    fn path_for(&self, uuid: Uuid) -> PathBuf {
        self.recipes_dir.join(format!("{uuid}.json"))
    }
}

#[async_trait]
impl RecipeCatalog for RecipeDirectory {
    async fn from_uuid(&self, uuid: Uuid) -> Result<DeploymentRecipe> {
        let path = self.path_for(uuid);
        let body = tokio::fs::read_to_string(&path)
            .await
            .map_err(|_| Error::NotFound(format!("recipe {uuid} not found")))?;
        let recipe: DeploymentRecipe = serde_json::from_str(&body)?;
        Ok(recipe)
    }
}

#[derive(Default)]
pub struct InMemoryRecipes {
    recipes: HashMap<Uuid, DeploymentRecipe>,
}

impl InMemoryRecipes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, recipe: DeploymentRecipe) -> Self {
        self.recipes.insert(recipe.uuid, recipe);
        self
    }
}

#[async_trait]
impl RecipeCatalog for InMemoryRecipes {
    async fn from_uuid(&self, uuid: Uuid) -> Result<DeploymentRecipe> {
        self.recipes
            .get(&uuid)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("recipe {uuid} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_lookup_roundtrips() {
        let uuid = Uuid::new_v4();
        let recipe = DeploymentRecipe {
            uuid,
            restricted: false,
            chart_ref: "chart".into(),
        };
        let catalog = InMemoryRecipes::new().insert(recipe);
        let found = catalog.from_uuid(uuid).await.unwrap();
        assert_eq!(found.uuid, uuid);
    }

    #[tokio::test]
    async fn in_memory_unknown_uuid_is_not_found() {
        let catalog = InMemoryRecipes::new();
        assert!(catalog.from_uuid(Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn directory_reads_descriptor_by_uuid() {
        let dir = tempfile::tempdir().unwrap();
        let uuid = Uuid::new_v4();
        let recipe = DeploymentRecipe {
            uuid,
            restricted: true,
            chart_ref: "oci://example/chart".into(),
        };
        tokio::fs::write(
            dir.path().join(format!("{uuid}.json")),
            serde_json::to_string(&recipe).unwrap(),
        )
        .await
        .unwrap();

        let catalog = RecipeDirectory::new(dir.path());
        let found = catalog.from_uuid(uuid).await.unwrap();
        assert!(found.restricted);
    }
}
