//! Embedded (in-memory or single-file) fallback backend.
//!
//! No official Rust Qdrant client embeds the server the way Python's
//! `QdrantClient(path=...)` does — the ecosystem's client is gRPC-only. This
//! backend is a from-scratch, pure-Rust reimplementation of just enough of
//! Qdrant's hybrid-search semantics (RRF fusion, sparse dot-product and
//! dense cosine scoring, scroll, filtered delete) to serve `:memory:` and
//! local-file collection configurations, and incidentally makes `spec.md`
//! §8's testable properties and S1–S6 scenarios exercisable without a live
//! server. `spec.md` §4.5 step 5 / §9's "embedded engine may not honor
//! server filters" note is why the manager re-applies filters client-side on
//! top of this backend even though this implementation *does* apply them.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use ragcore_core::embedding::SparseVector;
use ragcore_core::model::{Metadata, SearchHit, VectorField, VectorRecord};
use ragcore_strategy::value::{QueryValue, VectorValue};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{QueryRequest, StoreBackend};
use crate::error::StoreError;
use crate::filter::{self, FilterSpec};
use crate::schema::CollectionSchema;

/// Reciprocal-rank-fusion constant (`1 / (k + rank)`), the conventional value.
const RRF_K: f32 = 60.0;

#[derive(Clone, Serialize, Deserialize)]
struct StoredVector {
    sparse: Option<(Vec<i32>, Vec<f32>)>,
    dense: Option<Vec<f32>>,
}

impl From<&VectorField> for StoredVector {
    fn from(field: &VectorField) -> Self {
        match field {
            VectorField::Sparse(v) => Self {
                sparse: Some((v.indices.clone(), v.values.clone())),
                dense: None,
            },
            VectorField::Dense(v) => Self {
                sparse: None,
                dense: Some(v.clone()),
            },
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
struct EmbeddedPoint {
    id: Uuid,
    vectors: BTreeMap<String, StoredVector>,
    payload: Metadata,
    seq: u64,
}

#[derive(Clone, Default, Serialize, Deserialize)]
struct EmbeddedCollection {
    points: Vec<EmbeddedPoint>,
    next_seq: u64,
}

#[derive(Default, Serialize, Deserialize)]
struct Snapshot {
    collections: BTreeMap<String, EmbeddedCollection>,
}

/// In-process store backend for `:memory:` and local-file connection modes.
pub struct EmbeddedBackend {
    state: RwLock<Snapshot>,
    persist_path: Option<PathBuf>,
}

impl EmbeddedBackend {
    /// Creates a pure in-memory backend with no persistence.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(Snapshot::default()),
            persist_path: None,
        }
    }

    /// Creates a backend persisted to `path` (a single JSON snapshot file,
    /// loaded if it already exists), matching the rationale in `spec.md`
    /// §4.6 that storing the catalog inside the store itself makes the
    /// system "single-file-portable in embedded mode".
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] if an existing snapshot cannot be read or parsed.
    pub fn local_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let snapshot = if path.exists() {
            let bytes =
                fs::read(path).map_err(|e| StoreError::Backend(format!("reading {}: {e}", path.display())))?;
            serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Backend(format!("parsing {}: {e}", path.display())))?
        } else {
            Snapshot::default()
        };
        Ok(Self {
            state: RwLock::new(snapshot),
            persist_path: Some(path.to_path_buf()),
        })
    }

    fn flush(&self) -> Result<(), StoreError> {
        let Some(path) = &self.persist_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Backend(format!("creating {}: {e}", parent.display())))?;
            }
        }
        let bytes = serde_json::to_vec(&*self.state.read())
            .map_err(|e| StoreError::Backend(format!("serializing snapshot: {e}")))?;
        fs::write(path, bytes).map_err(|e| StoreError::Backend(format!("writing {}: {e}", path.display())))
    }
}

impl StoreBackend for EmbeddedBackend {
    fn ensure_collection(&self, name: &str, _schema: &CollectionSchema) -> Result<(), StoreError> {
        let mut state = self.state.write();
        state.collections.entry(name.to_string()).or_default();
        drop(state);
        self.flush()
    }

    fn collection_exists(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.state.read().collections.contains_key(name))
    }

    fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.state.read().collections.keys().cloned().collect())
    }

    fn delete_collection(&self, name: &str) -> Result<(), StoreError> {
        self.state.write().collections.remove(name);
        self.flush()
    }

    fn upsert(&self, collection: &str, records: Vec<VectorRecord>) -> Result<(), StoreError> {
        let mut state = self.state.write();
        let entry = state.collections.entry(collection.to_string()).or_default();
        for record in records {
            let seq = entry.next_seq;
            entry.next_seq += 1;
            let vectors = record
                .vectors
                .iter()
                .map(|(name, field)| (name.clone(), StoredVector::from(field)))
                .collect();
            entry.points.retain(|p| p.id != record.id);
            entry.points.push(EmbeddedPoint {
                id: record.id,
                vectors,
                payload: record.payload,
                seq,
            });
        }
        drop(state);
        self.flush()
    }

    fn query(&self, collection: &str, request: &QueryRequest) -> Result<Vec<SearchHit>, StoreError> {
        let state = self.state.read();
        let Some(coll) = state.collections.get(collection) else {
            return Err(StoreError::CollectionNotFound(collection.to_string()));
        };

        let candidates: Vec<&EmbeddedPoint> = coll
            .points
            .iter()
            .filter(|p| {
                request
                    .filter
                    .as_ref()
                    .is_none_or(|f| filter::matches(f, &p.payload))
            })
            .collect();

        let mut scored = if request.prefetch.is_empty() {
            let field = request.use_vector_name.unwrap_or("");
            score_single(&candidates, field, &request.query)
        } else {
            score_fused(&candidates, &request.prefetch)
        };

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.2.cmp(&b.2)));
        scored.truncate(request.limit);

        Ok(scored
            .into_iter()
            .map(|(point, score, _)| SearchHit {
                id: point.id,
                score,
                payload: point.payload.clone(),
            })
            .collect())
    }

    fn scroll(
        &self,
        collection: &str,
        batch_size: usize,
        offset: Option<String>,
    ) -> Result<(Vec<SearchHit>, Option<String>), StoreError> {
        let state = self.state.read();
        let Some(coll) = state.collections.get(collection) else {
            return Err(StoreError::CollectionNotFound(collection.to_string()));
        };
        let mut points: Vec<&EmbeddedPoint> = coll.points.iter().collect();
        points.sort_by_key(|p| p.seq);

        let start = match &offset {
            None => 0,
            Some(cursor) => points
                .iter()
                .position(|p| p.id.to_string() == *cursor)
                .map_or(points.len(), |idx| idx + 1),
        };

        let batch: Vec<SearchHit> = points[start..]
            .iter()
            .take(batch_size)
            .map(|p| SearchHit {
                id: p.id,
                score: 0.0,
                payload: p.payload.clone(),
            })
            .collect();

        let next_offset = if start + batch.len() < points.len() {
            batch.last().map(|h| h.id.to_string())
        } else {
            None
        };

        Ok((batch, next_offset))
    }

    fn delete_by_filter(&self, collection: &str, filter: &FilterSpec) -> Result<usize, StoreError> {
        let mut state = self.state.write();
        let Some(coll) = state.collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = coll.points.len();
        coll.points.retain(|p| !crate::filter::matches(filter, &p.payload));
        let removed = before - coll.points.len();
        drop(state);
        self.flush()?;
        Ok(removed)
    }

    fn count(&self, collection: &str) -> Result<usize, StoreError> {
        let state = self.state.read();
        let Some(coll) = state.collections.get(collection) else {
            return Err(StoreError::CollectionNotFound(collection.to_string()));
        };
        Ok(coll.points.len())
    }

    fn is_embedded(&self) -> bool {
        true
    }
}

fn score_single<'p>(
    candidates: &[&'p EmbeddedPoint],
    field: &str,
    query: &QueryValue,
) -> Vec<(&'p EmbeddedPoint, f32, u64)> {
    // `Noop`-strategy collections (the catalog) write no vectors at all;
    // an empty field name means "filter-only match", every candidate scores 0.
    if field.is_empty() {
        return candidates.iter().map(|p| (*p, 0.0, p.seq)).collect();
    }
    let QueryValue::Vector(query_vector) = query else {
        return Vec::new();
    };
    candidates
        .iter()
        .filter_map(|p| {
            let stored = p.vectors.get(field)?;
            let score = score_against(stored, query_vector)?;
            Some((*p, score, p.seq))
        })
        .collect()
}

fn score_fused<'p>(
    candidates: &[&'p EmbeddedPoint],
    prefetch: &[ragcore_strategy::value::PrefetchSpec],
) -> Vec<(&'p EmbeddedPoint, f32, u64)> {
    let mut fused: BTreeMap<Uuid, (f32, &'p EmbeddedPoint)> = BTreeMap::new();

    for leg in prefetch {
        let mut ranked: Vec<(&'p EmbeddedPoint, f32)> = candidates
            .iter()
            .filter_map(|p| {
                let stored = p.vectors.get(&leg.field)?;
                let score = score_against(stored, &leg.query)?;
                Some((*p, score))
            })
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.seq.cmp(&b.0.seq)));
        ranked.truncate(leg.limit);

        for (rank, (point, _score)) in ranked.into_iter().enumerate() {
            let rrf_contribution = 1.0 / (RRF_K + rank as f32 + 1.0);
            let entry = fused.entry(point.id).or_insert((0.0, point));
            entry.0 += rrf_contribution;
        }
    }

    fused
        .into_values()
        .map(|(score, point)| (point, score, point.seq))
        .collect()
}

fn score_against(stored: &StoredVector, query: &VectorValue) -> Option<f32> {
    match (stored, query) {
        (
            StoredVector {
                sparse: Some((indices, values)),
                ..
            },
            VectorValue::Sparse(q),
        ) => Some(sparse_dot(indices, values, &q.indices, &q.values)),
        (
            StoredVector {
                dense: Some(vector),
                ..
            },
            VectorValue::Dense(query_vector),
        ) => Some(cosine(vector, query_vector)),
        _ => None,
    }
}

fn sparse_dot(a_idx: &[i32], a_val: &[f32], b_idx: &[i32], b_val: &[f32]) -> f32 {
    let mut b_map: BTreeMap<i32, f32> = BTreeMap::new();
    for (idx, val) in b_idx.iter().zip(b_val) {
        b_map.insert(*idx, *val);
    }
    a_idx
        .iter()
        .zip(a_val)
        .filter_map(|(idx, val)| b_map.get(idx).map(|bv| val * bv))
        .sum()
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragcore_strategy::value::PrefetchSpec;
    use std::collections::BTreeMap as Map;

    fn record(id: Uuid, dense: Vec<f32>, text: &str) -> VectorRecord {
        let mut vectors = Map::new();
        vectors.insert("dense".to_string(), VectorField::Dense(dense));
        let mut payload = Metadata::new();
        payload.insert("text".to_string(), text.to_string());
        payload.insert("source".to_string(), text.to_string());
        payload.insert("page".to_string(), "1".to_string());
        VectorRecord { id, vectors, payload }
    }

    #[test]
    fn upsert_then_count() {
        let backend = EmbeddedBackend::in_memory();
        backend
            .upsert("c", vec![record(Uuid::new_v4(), vec![1.0, 0.0], "a")])
            .unwrap();
        assert_eq!(backend.count("c").unwrap(), 1);
    }

    #[test]
    fn upsert_same_id_replaces() {
        let backend = EmbeddedBackend::in_memory();
        let id = Uuid::new_v4();
        backend.upsert("c", vec![record(id, vec![1.0, 0.0], "a")]).unwrap();
        backend.upsert("c", vec![record(id, vec![0.0, 1.0], "b")]).unwrap();
        assert_eq!(backend.count("c").unwrap(), 1);
    }

    #[test]
    fn single_field_query_ranks_by_cosine_similarity() {
        let backend = EmbeddedBackend::in_memory();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        backend
            .upsert("c", vec![record(a, vec![1.0, 0.0], "a"), record(b, vec![0.0, 1.0], "b")])
            .unwrap();
        let req = QueryRequest {
            prefetch: Vec::new(),
            query: QueryValue::Vector(VectorValue::Dense(vec![1.0, 0.0])),
            use_vector_name: Some("dense"),
            limit: 5,
            filter: None,
        };
        let hits = backend.query("c", &req).unwrap();
        assert_eq!(hits[0].id, a);
    }

    #[test]
    fn fused_query_prefers_doc_ranked_first_by_both_legs() {
        let backend = EmbeddedBackend::in_memory();
        let d_match = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut vectors_match = Map::new();
        vectors_match.insert("dense".to_string(), VectorField::Dense(vec![1.0, 0.0]));
        vectors_match.insert(
            "sparse".to_string(),
            VectorField::Sparse(SparseVector::new(vec![(1, 1.0)])),
        );
        let mut payload = Metadata::new();
        payload.insert("text".to_string(), "match".to_string());
        backend
            .upsert(
                "c",
                vec![VectorRecord {
                    id: d_match,
                    vectors: vectors_match,
                    payload,
                }],
            )
            .unwrap();
        backend.upsert("c", vec![record(other, vec![0.0, 1.0], "other")]).unwrap();

        let req = QueryRequest {
            prefetch: vec![
                PrefetchSpec {
                    field: "sparse".to_string(),
                    query: VectorValue::Sparse(SparseVector::new(vec![(1, 1.0)])),
                    limit: 5,
                },
                PrefetchSpec {
                    field: "dense".to_string(),
                    query: VectorValue::Dense(vec![1.0, 0.0]),
                    limit: 5,
                },
            ],
            query: QueryValue::Fusion,
            use_vector_name: None,
            limit: 5,
            filter: None,
        };
        let hits = backend.query("c", &req).unwrap();
        assert_eq!(hits[0].id, d_match);
    }

    #[test]
    fn delete_by_filter_removes_matching_points() {
        let backend = EmbeddedBackend::in_memory();
        backend
            .upsert("c", vec![record(Uuid::new_v4(), vec![1.0, 0.0], "a")])
            .unwrap();
        let mut filter = FilterSpec::new();
        filter.insert("source".to_string(), filter::FilterValue::Scalar("a".to_string()));
        let removed = backend.delete_by_filter("c", &filter).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(backend.count("c").unwrap(), 0);
    }

    #[test]
    fn scroll_paginates_in_insertion_order() {
        let backend = EmbeddedBackend::in_memory();
        for i in 0..5 {
            backend
                .upsert("c", vec![record(Uuid::new_v4(), vec![1.0, 0.0], &format!("doc{i}"))])
                .unwrap();
        }
        let (first, offset) = backend.scroll("c", 2, None).unwrap();
        assert_eq!(first.len(), 2);
        assert!(offset.is_some());
        let (second, _) = backend.scroll("c", 2, offset).unwrap();
        assert_eq!(second.len(), 2);
        assert_ne!(first[0].id, second[0].id);
    }

    #[test]
    fn local_file_backend_persists_across_instances() {
        let dir = std::env::temp_dir().join(format!("ragcore-store-test-{}", Uuid::new_v4()));
        let path = dir.join("snapshot.json");
        {
            let backend = EmbeddedBackend::local_file(&path).unwrap();
            backend
                .upsert("c", vec![record(Uuid::new_v4(), vec![1.0, 0.0], "a")])
                .unwrap();
        }
        let reopened = EmbeddedBackend::local_file(&path).unwrap();
        assert_eq!(reopened.count("c").unwrap(), 1);
        let _ = fs::remove_dir_all(&dir);
    }
}
