use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::DataSetAccess;
use crate::database::models::ProjectInstance;
use crate::database::query_service::{QueryOptions, QueryService};
use crate::filter::{PaginatedList, PaginatedQuery};
use crate::services::{RequestContext, ServiceError, Validator};

pub const NAME_MAX: usize = 200;
pub const DESCRIPTION_MAX: usize = 1000;
pub const MAIN_HOST_MAX: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProjectInstanceDto {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub main_host: Option<String>,
    pub notes: Option<String>,
    pub parent_project_id: Option<Uuid>,
    /// Shallow copy of the parent: its own links are not populated.
    pub parent_project: Option<Box<ProjectInstanceDto>>,
    pub child_projects: Vec<ProjectInstanceDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_by: String,
}

impl From<&ProjectInstance> for ProjectInstanceDto {
    fn from(p: &ProjectInstance) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            description: p.description.clone(),
            main_host: p.main_host.clone(),
            notes: p.notes.clone(),
            parent_project_id: p.parent_project_id,
            parent_project: None,
            child_projects: Vec::new(),
            created_at: p.created_at,
            updated_at: p.updated_at,
            created_by: p.created_by.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SaveProjectInstanceCommand {
    pub id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub main_host: Option<String>,
    pub notes: Option<String>,
    pub parent_project_id: Option<Uuid>,
}

/// Parent/child links among a set of projects.
struct ProjectTree<'a> {
    by_id: HashMap<Uuid, &'a ProjectInstance>,
    children: HashMap<Uuid, Vec<&'a ProjectInstance>>,
}

impl<'a> ProjectTree<'a> {
    fn new(projects: &'a [ProjectInstance]) -> Self {
        let by_id: HashMap<_, _> = projects.iter().map(|p| (p.id, p)).collect();
        let mut children: HashMap<Uuid, Vec<&ProjectInstance>> = HashMap::new();
        for p in projects {
            if let Some(parent) = p.parent_project_id {
                children.entry(parent).or_default().push(p);
            }
        }
        Self { by_id, children }
    }

    /// True when the parent chain ends at a root inside the set.
    fn reaches_root(&self, id: Uuid) -> bool {
        let mut seen = HashSet::new();
        let mut current = self.by_id.get(&id);
        while let Some(p) = current {
            if !seen.insert(p.id) {
                return false;
            }
            match p.parent_project_id {
                None => return true,
                Some(parent) => current = self.by_id.get(&parent),
            }
        }
        false
    }

    fn node(&self, project: &ProjectInstance, with_children: bool, path: &mut HashSet<Uuid>) -> ProjectInstanceDto {
        let mut dto = ProjectInstanceDto::from(project);
        dto.parent_project = project
            .parent_project_id
            .and_then(|parent| self.by_id.get(&parent))
            .map(|parent| Box::new(ProjectInstanceDto::from(*parent)));

        if with_children && path.insert(project.id) {
            dto.child_projects = self
                .children
                .get(&project.id)
                .map(|kids| kids.iter().map(|kid| self.node(kid, true, path)).collect())
                .unwrap_or_default();
            path.remove(&project.id);
        }
        dto
    }

    /// DTOs in input order; children are resolved for projects whose chain reaches a root.
    fn link(&self, projects: &[ProjectInstance]) -> Vec<ProjectInstanceDto> {
        projects
            .iter()
            .map(|p| self.node(p, self.reaches_root(p.id), &mut HashSet::new()))
            .collect()
    }
}

pub struct ProjectInstanceService<'a> {
    ctx: &'a RequestContext,
}

impl<'a> ProjectInstanceService<'a> {
    pub fn new(ctx: &'a RequestContext) -> Self {
        Self { ctx }
    }

    fn query(&self) -> QueryService<'_, ProjectInstance> {
        QueryService::new(&self.ctx.pool, &self.ctx.config)
    }

    pub async fn list(&self, request: &PaginatedQuery) -> Result<PaginatedList<ProjectInstanceDto>, ServiceError> {
        let query = self.query();
        let filter = query.prepare(
            &QueryOptions::new(request.filtering.clone(), request.ordering.clone()),
            &DataSetAccess::All,
        )?;
        let page = query.execute_paginated(filter, &request.pagination).await?;
        Ok(page.map_items(|items| ProjectTree::new(&items).link(&items)))
    }

    /// The project with its parent and its full subtree.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<ProjectInstanceDto>, ServiceError> {
        if self.query().get_by_id(id, &DataSetAccess::All).await?.is_none() {
            return Ok(None);
        }
        let all = self.all_projects().await?;
        let tree = ProjectTree::new(&all);
        Ok(tree.by_id.get(&id).map(|p| tree.node(p, true, &mut HashSet::new())))
    }

    pub async fn save(&self, command: &SaveProjectInstanceCommand) -> Result<Uuid, ServiceError> {
        let existing_id = command.id.filter(|id| !id.is_nil());
        self.validate(command, existing_id).await?;
        let now = Utc::now();

        match existing_id {
            Some(id) => {
                let updated = sqlx::query(
                    "UPDATE project_instances SET name = ?, description = ?, main_host = ?, notes = ?, \
                     parent_project_id = ?, updated_at = ?, updated_by = ? WHERE id = ?",
                )
                .bind(&command.name)
                .bind(&command.description)
                .bind(&command.main_host)
                .bind(&command.notes)
                .bind(command.parent_project_id.map(|p| p.to_string()))
                .bind(now)
                .bind(self.ctx.actor())
                .bind(id.to_string())
                .execute(&self.ctx.pool)
                .await?;

                if updated.rows_affected() == 0 {
                    return Err(ServiceError::NotFound(format!("ProjectInstance with Id {} not found.", id)));
                }
                tracing::info!("Updated project instance {}", id);
                Ok(id)
            }
            None => {
                let id = Uuid::new_v4();
                sqlx::query(
                    "INSERT INTO project_instances (id, name, description, main_host, notes, parent_project_id, \
                     created_at, created_by) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(id.to_string())
                .bind(&command.name)
                .bind(&command.description)
                .bind(&command.main_host)
                .bind(&command.notes)
                .bind(command.parent_project_id.map(|p| p.to_string()))
                .bind(now)
                .bind(self.ctx.actor())
                .execute(&self.ctx.pool)
                .await?;

                tracing::info!("Created project instance {} ({})", id, command.name);
                Ok(id)
            }
        }
    }

    /// `false` when the project does not exist.
    pub async fn delete(&self, id: Uuid) -> Result<bool, ServiceError> {
        if self.query().get_by_id(id, &DataSetAccess::All).await?.is_none() {
            return Ok(false);
        }

        let children: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM project_instances WHERE parent_project_id = ?")
            .bind(id.to_string())
            .fetch_one(&self.ctx.pool)
            .await?;
        if children > 0 {
            return Err(ServiceError::Conflict(format!(
                "ProjectInstance {} has {} child project(s) and cannot be deleted.",
                id, children
            )));
        }

        sqlx::query("DELETE FROM project_instances WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.ctx.pool)
            .await?;
        tracing::info!("Deleted project instance {}", id);
        Ok(true)
    }

    async fn all_projects(&self) -> Result<Vec<ProjectInstance>, ServiceError> {
        let query = self.query();
        let filter = query.prepare(&QueryOptions::default(), &DataSetAccess::All)?;
        Ok(query.fetch_all(filter).await?)
    }

    async fn validate(&self, command: &SaveProjectInstanceCommand, id: Option<Uuid>) -> Result<(), ServiceError> {
        let mut v = Validator::new();
        v.required("Name", &command.name)
            .max_len("Name", Some(command.name.as_str()), NAME_MAX)
            .max_len("Description", command.description.as_deref(), DESCRIPTION_MAX)
            .max_len("MainHost", command.main_host.as_deref(), MAIN_HOST_MAX);

        if let Some(parent) = command.parent_project_id {
            if Some(parent) == id {
                v.error("ParentProjectId", "A project cannot be its own parent.");
            } else if self.query().get_by_id(parent, &DataSetAccess::All).await?.is_none() {
                v.error("ParentProjectId", format!("Parent project {} does not exist.", parent));
            } else if let Some(id) = id {
                if self.is_ancestor_or_self(id, parent).await? {
                    v.error("ParentProjectId", "The selected parent would create a cycle in the project hierarchy.");
                }
            }
        }
        v.finish()
    }

    /// Whether `candidate` appears on the parent chain starting at `start`.
    async fn is_ancestor_or_self(&self, candidate: Uuid, start: Uuid) -> Result<bool, ServiceError> {
        let found: i64 = sqlx::query_scalar(
            "WITH RECURSIVE chain(id) AS ( \
                 SELECT ? \
                 UNION \
                 SELECT p.parent_project_id FROM project_instances p JOIN chain c ON p.id = c.id \
                 WHERE p.parent_project_id IS NOT NULL \
             ) SELECT COUNT(*) FROM chain WHERE id = ?",
        )
        .bind(start.to_string())
        .bind(candidate.to_string())
        .fetch_one(&self.ctx.pool)
        .await?;
        Ok(found > 0)
    }
}
