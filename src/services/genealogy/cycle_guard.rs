use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::repositories::GenealogyStore;

/// Per-call record of serialized parts already emitted by a traversal.
#[derive(Debug, Default, Clone)]
pub struct VisitedSet {
    seen: HashSet<Uuid>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: Uuid) -> Self {
        let mut set = Self::new();
        set.seen.insert(root);
        set
    }

    /// Marks `id` as visited. Returns `false` if it already was.
    pub fn first_visit(&mut self, id: Uuid) -> bool {
        self.seen.insert(id)
    }
}

/// Answers acyclicity questions about the stored genealogy graph.
pub struct CircularReferenceGuard {
    store: Arc<dyn GenealogyStore>,
}

impl CircularReferenceGuard {
    pub fn new(store: Arc<dyn GenealogyStore>) -> Self {
        Self { store }
    }

    async fn children(&self, id: Uuid) -> Result<Vec<Uuid>, ServiceError> {
        Ok(self
            .store
            .find_genealogy_edges_by_parent_id(id)
            .await?
            .into_iter()
            .map(|edge| edge.component_part_id)
            .collect())
    }

    /// Whether adding `parent_id -> component_id` would close a loop, i.e.
    /// `parent_id` is already reachable below `component_id`.
    #[instrument(skip(self))]
    pub async fn would_create_cycle(
        &self,
        parent_id: Uuid,
        component_id: Uuid,
    ) -> Result<bool, ServiceError> {
        if parent_id == component_id {
            return Ok(true);
        }

        let mut visited = VisitedSet::with_root(component_id);
        let mut stack = vec![component_id];

        while let Some(node) = stack.pop() {
            for child in self.children(node).await? {
                if child == parent_id {
                    debug!(%parent_id, %component_id, via = %node, "Proposed edge closes a loop");
                    return Ok(true);
                }
                if visited.first_visit(child) {
                    stack.push(child);
                }
            }
        }

        Ok(false)
    }

    /// Depth-first search from `root_id` tracking the current path. Any edge
    /// pointing back into the path is a cycle.
    #[instrument(skip(self))]
    pub async fn has_cycle(&self, root_id: Uuid) -> Result<bool, ServiceError> {
        let mut on_path: HashSet<Uuid> = HashSet::from([root_id]);
        let mut finished: HashSet<Uuid> = HashSet::new();
        let mut stack = vec![(root_id, self.children(root_id).await?.into_iter())];

        loop {
            let next = match stack.last_mut() {
                Some((_, children)) => children.next(),
                None => break,
            };

            match next {
                Some(child) => {
                    if on_path.contains(&child) {
                        debug!(%root_id, back_edge_target = %child, "Cycle found");
                        return Ok(true);
                    }
                    if finished.contains(&child) {
                        continue;
                    }
                    let grandchildren = self.children(child).await?;
                    on_path.insert(child);
                    stack.push((child, grandchildren.into_iter()));
                }
                None => {
                    if let Some((node, _)) = stack.pop() {
                        on_path.remove(&node);
                        finished.insert(node);
                    }
                }
            }
        }

        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryGenealogyStore;
    use crate::models::{Part, PartType, SerializedPart};

    async fn chain(store: &InMemoryGenealogyStore, len: usize) -> Vec<Uuid> {
        let mut ids = Vec::new();
        for i in 0..len {
            let sp = SerializedPart::new(
                format!("SN-{i}"),
                Part::new("PN", "Node", PartType::Assembly),
            );
            ids.push(sp.id);
            store.insert_part(sp).await;
        }
        for pair in ids.windows(2) {
            store.insert_edge(pair[0], pair[1]).await;
        }
        ids
    }

    #[test]
    fn visited_set_reports_first_visit_once() {
        let root = Uuid::new_v4();
        let mut visited = VisitedSet::with_root(root);
        assert!(!visited.first_visit(root));
        let other = Uuid::new_v4();
        assert!(visited.first_visit(other));
        assert!(!visited.first_visit(other));
    }

    #[tokio::test]
    async fn self_loop_is_always_a_cycle() {
        let guard = CircularReferenceGuard::new(Arc::new(InMemoryGenealogyStore::new()));
        let id = Uuid::new_v4();
        assert!(guard.would_create_cycle(id, id).await.unwrap());
    }

    #[tokio::test]
    async fn closing_a_chain_is_detected() {
        let store = Arc::new(InMemoryGenealogyStore::new());
        let ids = chain(&store, 4).await;
        let guard = CircularReferenceGuard::new(store);

        // ids[0] contains ids[1] contains ... ids[3]; making ids[0] a component of ids[3] loops.
        assert!(guard.would_create_cycle(ids[3], ids[0]).await.unwrap());
        assert!(!guard.would_create_cycle(ids[0], ids[3]).await.unwrap());
        assert!(!guard.has_cycle(ids[0]).await.unwrap());
    }

    #[tokio::test]
    async fn diamond_is_not_a_cycle() {
        let store = Arc::new(InMemoryGenealogyStore::new());
        let ids = chain(&store, 3).await;
        store.insert_edge(ids[0], ids[2]).await;
        let guard = CircularReferenceGuard::new(store);

        assert!(!guard.has_cycle(ids[0]).await.unwrap());
    }

    #[tokio::test]
    async fn corrupt_back_edge_is_found_and_walks_terminate() {
        let store = Arc::new(InMemoryGenealogyStore::new());
        let ids = chain(&store, 3).await;
        store.insert_edge(ids[2], ids[0]).await;
        let guard = CircularReferenceGuard::new(store);

        assert!(guard.has_cycle(ids[0]).await.unwrap());
        assert!(guard.has_cycle(ids[1]).await.unwrap());
        let outsider = Uuid::new_v4();
        assert!(!guard.would_create_cycle(outsider, ids[0]).await.unwrap());
    }
}
