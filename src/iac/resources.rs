//! Typed resource model and dependency ordering
//!
//! The provisioned stack is modeled as a graph of named resource groups
//! with explicit `depends_on` edges. Renderers walk [`ResourceGraph::ordered`]
//! so creation order and the emitted `depends_on` lists always agree with
//! the model instead of being hardcoded in templates.

use crate::config::{ProjectConfig, ResourceNames};
use indexmap::IndexMap;
use std::collections::HashSet;
use thiserror::Error;

/// Errors produced while assembling or ordering the resource graph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("resource '{from}' depends on unknown resource '{to}'")]
    UnknownDependency { from: String, to: String },

    #[error("duplicate resource id '{0}'")]
    DuplicateId(String),

    #[error("dependency cycle among resources: {0:?}")]
    DependencyCycle(Vec<String>),
}

/// Artifact storage bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageBucket {
    pub name: String,
    pub location: String,
    pub labels: IndexMap<String, String>,
}

/// Service account the pipeline or build jobs run as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAccount {
    pub account_id: String,
    pub display_name: String,
    pub description: String,
}

impl ServiceAccount {
    /// IAM member string for this account in `project_id`
    pub fn member(&self, project_id: &str) -> String {
        format!(
            "serviceAccount:{}@{}.iam.gserviceaccount.com",
            self.account_id, project_id
        )
    }
}

/// Project-level role bindings for one service account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IamBindingSet {
    pub account_id: String,
    pub description: String,
    pub roles: Vec<String>,
}

/// Docker artifact registry holding component images
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRegistry {
    pub repository_id: String,
    pub format: String,
    pub location: String,
    pub description: String,
}

/// Source repository the build trigger watches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRepository {
    pub name: String,
}

/// Task queue for scheduled pipeline submissions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskQueue {
    pub name: String,
    pub location: String,
}

/// Build trigger rebuilding component images on push
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTrigger {
    pub name: String,
    pub filename: String,
    pub branch: String,
    pub repo: String,
    pub service_account_id: String,
}

/// One node in the provisioning graph. List variants render as
/// config-driven loops; the rest render as single resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceSpec {
    Buckets(Vec<StorageBucket>),
    ServiceAccounts(Vec<ServiceAccount>),
    IamBindings(Vec<IamBindingSet>),
    ArtifactRegistry(ArtifactRegistry),
    SourceRepository(SourceRepository),
    TaskQueue(TaskQueue),
    BuildTrigger(BuildTrigger),
}

/// A named resource group and the ids it depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: String,
    pub spec: ResourceSpec,
    pub depends_on: Vec<String>,
}

/// Insertion-ordered resource graph
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    resources: Vec<Resource>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource group to the graph
    pub fn add(
        &mut self,
        id: impl Into<String>,
        spec: ResourceSpec,
        depends_on: &[&str],
    ) -> Result<(), ResourceError> {
        let id = id.into();
        if self.resources.iter().any(|r| r.id == id) {
            return Err(ResourceError::DuplicateId(id));
        }
        self.resources.push(Resource {
            id,
            spec,
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
        });
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == id)
    }

    /// Resources in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resources in creation order: every resource appears after all of its
    /// dependencies, and insertion order is preserved among resources whose
    /// dependencies are already satisfied.
    pub fn ordered(&self) -> Result<Vec<&Resource>, ResourceError> {
        // validate edges up front so the error names the offending pair
        let ids: HashSet<&str> = self.resources.iter().map(|r| r.id.as_str()).collect();
        for resource in &self.resources {
            for dep in &resource.depends_on {
                if !ids.contains(dep.as_str()) {
                    return Err(ResourceError::UnknownDependency {
                        from: resource.id.clone(),
                        to: dep.clone(),
                    });
                }
            }
        }

        let mut emitted: HashSet<&str> = HashSet::new();
        let mut order: Vec<&Resource> = Vec::with_capacity(self.resources.len());

        while order.len() < self.resources.len() {
            let next = self.resources.iter().find(|r| {
                !emitted.contains(r.id.as_str())
                    && r.depends_on.iter().all(|d| emitted.contains(d.as_str()))
            });
            match next {
                Some(resource) => {
                    emitted.insert(resource.id.as_str());
                    order.push(resource);
                }
                None => {
                    let stuck: Vec<String> = self
                        .resources
                        .iter()
                        .filter(|r| !emitted.contains(r.id.as_str()))
                        .map(|r| r.id.clone())
                        .collect();
                    return Err(ResourceError::DependencyCycle(stuck));
                }
            }
        }

        Ok(order)
    }

    /// The stack andamio provisions for a model pipeline: artifact bucket,
    /// runner service accounts, their role bindings, a Docker registry, a
    /// source repository, a submission queue, and a build trigger wired to
    /// the repository and the build runner account.
    pub fn standard(project: &ProjectConfig, names: &ResourceNames, build_branch: &str) -> Self {
        let mut labels = IndexMap::new();
        labels.insert("managed-by".to_string(), "andamio".to_string());
        labels.insert("model".to_string(), names.model.clone());

        let accounts = vec![
            ServiceAccount {
                account_id: "pipeline-runner-sa".to_string(),
                display_name: "Pipeline Runner Service Account".to_string(),
                description: "For submitting PipelineJobs".to_string(),
            },
            ServiceAccount {
                account_id: "build-runner-sa".to_string(),
                display_name: "Build Runner Service Account".to_string(),
                description: "For submitting build jobs".to_string(),
            },
        ];

        let bindings = vec![
            IamBindingSet {
                account_id: "pipeline-runner-sa".to_string(),
                description: "IAM roles for submitting PipelineJobs".to_string(),
                roles: [
                    "roles/aiplatform.user",
                    "roles/artifactregistry.reader",
                    "roles/bigquery.user",
                    "roles/bigquery.dataEditor",
                    "roles/iam.serviceAccountUser",
                    "roles/storage.admin",
                    "roles/run.admin",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            },
            IamBindingSet {
                account_id: "build-runner-sa".to_string(),
                description: "IAM roles for submitting build jobs".to_string(),
                roles: [
                    "roles/run.admin",
                    "roles/iam.serviceAccountUser",
                    "roles/cloudtasks.enqueuer",
                    "roles/cloudscheduler.admin",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            },
        ];

        let mut graph = Self::new();
        // ids are fixed, insertion is infallible
        let _ = graph.add(
            "buckets",
            ResourceSpec::Buckets(vec![StorageBucket {
                name: names.bucket.clone(),
                location: project.region.clone(),
                labels,
            }]),
            &[],
        );
        let _ = graph.add(
            "service-accounts",
            ResourceSpec::ServiceAccounts(accounts),
            &[],
        );
        let _ = graph.add(
            "iam-bindings",
            ResourceSpec::IamBindings(bindings),
            &["service-accounts"],
        );
        let _ = graph.add(
            "artifact-registry",
            ResourceSpec::ArtifactRegistry(ArtifactRegistry {
                repository_id: names.artifact_repo.clone(),
                format: "DOCKER".to_string(),
                location: project.region.clone(),
                description: "Docker artifact repository".to_string(),
            }),
            &[],
        );
        let _ = graph.add(
            "source-repository",
            ResourceSpec::SourceRepository(SourceRepository {
                name: names.source_repo.clone(),
            }),
            &[],
        );
        let _ = graph.add(
            "task-queue",
            ResourceSpec::TaskQueue(TaskQueue {
                name: names.task_queue.clone(),
                location: project.region.clone(),
            }),
            &[],
        );
        let _ = graph.add(
            "build-trigger",
            ResourceSpec::BuildTrigger(BuildTrigger {
                name: names.build_trigger.clone(),
                filename: "cloudbuild.yaml".to_string(),
                branch: build_branch.to_string(),
                repo: names.source_repo.clone(),
                service_account_id: "build-runner-sa".to_string(),
            }),
            &["source-repository", "service-accounts"],
        );

        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AndamioConfig;

    fn standard_graph() -> ResourceGraph {
        let config = AndamioConfig::default();
        let names = config.resource_names().unwrap();
        ResourceGraph::standard(&config.project, &names, &config.infra.build_branch)
    }

    fn spec_marker() -> ResourceSpec {
        ResourceSpec::SourceRepository(SourceRepository {
            name: "repo".to_string(),
        })
    }

    // ========================================================================
    // GRAPH CONSTRUCTION TESTS
    // ========================================================================

    #[test]
    fn test_add_duplicate_id() {
        let mut graph = ResourceGraph::new();
        graph.add("a", spec_marker(), &[]).unwrap();
        assert_eq!(
            graph.add("a", spec_marker(), &[]),
            Err(ResourceError::DuplicateId("a".to_string()))
        );
    }

    #[test]
    fn test_get() {
        let mut graph = ResourceGraph::new();
        graph.add("a", spec_marker(), &[]).unwrap();
        assert!(graph.get("a").is_some());
        assert!(graph.get("b").is_none());
    }

    // ========================================================================
    // ORDERING TESTS
    // ========================================================================

    #[test]
    fn test_ordered_empty() {
        let graph = ResourceGraph::new();
        assert!(graph.ordered().unwrap().is_empty());
    }

    #[test]
    fn test_ordered_preserves_insertion_order_without_edges() {
        let mut graph = ResourceGraph::new();
        graph.add("c", spec_marker(), &[]).unwrap();
        graph.add("a", spec_marker(), &[]).unwrap();
        graph.add("b", spec_marker(), &[]).unwrap();

        let ids: Vec<&str> = graph.ordered().unwrap().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_ordered_respects_dependencies() {
        let mut graph = ResourceGraph::new();
        graph.add("trigger", spec_marker(), &["repo"]).unwrap();
        graph.add("repo", spec_marker(), &[]).unwrap();

        let ids: Vec<&str> = graph.ordered().unwrap().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["repo", "trigger"]);
    }

    #[test]
    fn test_ordered_unknown_dependency() {
        let mut graph = ResourceGraph::new();
        graph.add("a", spec_marker(), &["ghost"]).unwrap();

        assert_eq!(
            graph.ordered().unwrap_err(),
            ResourceError::UnknownDependency {
                from: "a".to_string(),
                to: "ghost".to_string(),
            }
        );
    }

    #[test]
    fn test_ordered_cycle_detected() {
        let mut graph = ResourceGraph::new();
        graph.add("a", spec_marker(), &["b"]).unwrap();
        graph.add("b", spec_marker(), &["a"]).unwrap();

        match graph.ordered().unwrap_err() {
            ResourceError::DependencyCycle(stuck) => {
                assert_eq!(stuck, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    // ========================================================================
    // STANDARD STACK TESTS
    // ========================================================================

    #[test]
    fn test_standard_stack_shape() {
        let graph = standard_graph();
        assert_eq!(graph.len(), 7);
        assert!(graph.get("buckets").is_some());
        assert!(graph.get("build-trigger").is_some());
    }

    #[test]
    fn test_standard_stack_ordering() {
        let graph = standard_graph();
        let ids: Vec<&str> = graph.ordered().unwrap().iter().map(|r| r.id.as_str()).collect();

        let pos = |id: &str| ids.iter().position(|x| *x == id).unwrap();
        assert!(pos("service-accounts") < pos("iam-bindings"));
        assert!(pos("source-repository") < pos("build-trigger"));
        assert!(pos("service-accounts") < pos("build-trigger"));
    }

    #[test]
    fn test_standard_stack_trigger_edges() {
        let graph = standard_graph();
        let trigger = graph.get("build-trigger").unwrap();
        assert_eq!(trigger.depends_on, vec!["source-repository", "service-accounts"]);
    }

    #[test]
    fn test_standard_stack_role_bindings() {
        let graph = standard_graph();
        let Some(Resource {
            spec: ResourceSpec::IamBindings(bindings),
            ..
        }) = graph.get("iam-bindings")
        else {
            panic!("iam-bindings missing");
        };

        assert_eq!(bindings.len(), 2);
        assert!(bindings[0].roles.contains(&"roles/aiplatform.user".to_string()));
        assert!(bindings[1].roles.contains(&"roles/cloudtasks.enqueuer".to_string()));
    }

    #[test]
    fn test_service_account_member() {
        let account = ServiceAccount {
            account_id: "pipeline-runner-sa".to_string(),
            display_name: String::new(),
            description: String::new(),
        };
        assert_eq!(
            account.member("acme-ml"),
            "serviceAccount:pipeline-runner-sa@acme-ml.iam.gserviceaccount.com"
        );
    }
}
