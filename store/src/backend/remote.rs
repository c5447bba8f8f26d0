//! Remote Qdrant backend: a thin synchronous wrapper over the official
//! (`tonic`/async) `qdrant-client` crate.
//!
//! `spec.md` §5 mandates a multi-threaded, blocking runtime with no
//! cooperative suspension points. `qdrant-client`'s API is `async`; this
//! backend owns a small current-thread Tokio runtime purely to `block_on`
//! each call, so every public method here blocks the calling thread exactly
//! once and never yields control back to a caller-visible executor — the
//! "qdrant-client's blocking runtime wrapper" `SPEC_FULL.md` §5 names.

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    PrefetchQueryBuilder, PointStruct, QueryPointsBuilder, ScalarQuantizationBuilder,
    ScrollPointsBuilder, SparseVectorParamsBuilder, UpsertPointsBuilder, Value as QdrantValue,
    VectorParamsBuilder,
};
use ragcore_core::model::{Metadata, SearchHit, VectorField, VectorRecord};
use ragcore_strategy::value::{QueryValue, VectorValue};
use tokio::runtime::Runtime;

use super::{QueryRequest, StoreBackend};
use crate::error::StoreError;
use crate::filter::{FilterSpec, FilterValue};
use crate::schema::{CollectionSchema, QUANTIZATION_QUANTILE};

/// A Qdrant backend reached over HTTP(S) or gRPC.
pub struct RemoteBackend {
    client: Qdrant,
    rt: Runtime,
}

impl RemoteBackend {
    /// Connects to a `http(s)://` server, optionally authenticated.
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] if the client cannot be constructed.
    pub fn connect_http(url: &str, api_key: Option<&str>) -> Result<Self, StoreError> {
        let mut builder = Qdrant::from_url(url);
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        let client = builder.build().map_err(|e| StoreError::Backend(e.to_string()))?;
        let rt = Runtime::new().map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Self { client, rt })
    }

    /// Connects over gRPC to a `dns://host:port` address, preferring gRPC
    /// transport as `QdrantManager.__init__`'s `dns://` branch does.
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] if the client cannot be constructed.
    pub fn connect_grpc(dns_url: &str) -> Result<Self, StoreError> {
        let url = dns_url.trim_start_matches("dns://");
        let client = Qdrant::from_url(&format!("http://{url}"))
            .build()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let rt = Runtime::new().map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Self { client, rt })
    }
}

fn build_filter(filter: &FilterSpec) -> Filter {
    let must = filter
        .iter()
        .map(|(key, value)| match value {
            FilterValue::Scalar(v) => Condition::matches(key, v.clone()),
            FilterValue::AnyOf(values) => Condition::matches(key, values.clone()),
        })
        .collect();
    Filter {
        must,
        ..Default::default()
    }
}

fn payload_to_metadata(payload: impl IntoIterator<Item = (String, QdrantValue)>) -> Metadata {
    payload
        .into_iter()
        .map(|(k, v)| (k, qdrant_value_to_string(&v)))
        .collect()
}

fn qdrant_value_to_string(value: &QdrantValue) -> String {
    value
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

fn metadata_to_payload(metadata: &Metadata) -> qdrant_client::Payload {
    let mut payload = qdrant_client::Payload::new();
    for (k, v) in metadata {
        payload.insert(k.clone(), v.clone());
    }
    payload
}

impl StoreBackend for RemoteBackend {
    fn ensure_collection(&self, name: &str, schema: &CollectionSchema) -> Result<(), StoreError> {
        if self.collection_exists(name)? {
            return Ok(());
        }
        let mut builder = CreateCollectionBuilder::new(name);
        if let Some((_field, dim)) = schema.dense {
            builder = builder.vectors_config(VectorParamsBuilder::new(dim as u64, Distance::Cosine));
        }
        for field in &schema.sparse_fields {
            builder = builder
                .sparse_vectors_config((*field).to_string(), SparseVectorParamsBuilder::default());
        }
        builder = builder.quantization_config(
            ScalarQuantizationBuilder::default()
                .quantile(QUANTIZATION_QUANTILE)
                .always_ram(true),
        );
        self.rt
            .block_on(self.client.create_collection(builder))
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    fn collection_exists(&self, name: &str) -> Result<bool, StoreError> {
        self.rt
            .block_on(self.client.collection_exists(name))
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let response = self
            .rt
            .block_on(self.client.list_collections())
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(response.collections.into_iter().map(|c| c.name).collect())
    }

    fn delete_collection(&self, name: &str) -> Result<(), StoreError> {
        self.rt
            .block_on(self.client.delete_collection(name))
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    fn upsert(&self, collection: &str, records: Vec<VectorRecord>) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let points: Vec<PointStruct> = records
            .into_iter()
            .map(|record| {
                let mut point = PointStruct::new(
                    record.id.to_string(),
                    vec![],
                    metadata_to_payload(&record.payload),
                );
                for (name, field) in record.vectors {
                    match field {
                        VectorField::Dense(v) => {
                            point.vectors.as_mut().map(|vectors| vectors.insert_named(&name, v));
                        }
                        VectorField::Sparse(v) => {
                            point.vectors.as_mut().map(|vectors| {
                                vectors.insert_named(&name, (v.indices, v.values));
                            });
                        }
                    }
                }
                point
            })
            .collect();
        self.rt
            .block_on(
                self.client
                    .upsert_points(UpsertPointsBuilder::new(collection, points)),
            )
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    fn query(&self, collection: &str, request: &QueryRequest) -> Result<Vec<SearchHit>, StoreError> {
        let mut builder = QueryPointsBuilder::new(collection)
            .limit(request.limit as u64)
            .with_payload(true)
            .with_vectors(false);

        if let Some(filter) = &request.filter {
            builder = builder.filter(build_filter(filter));
        }

        for leg in &request.prefetch {
            let vector = match &leg.query {
                VectorValue::Dense(v) => v.clone().into(),
                VectorValue::Sparse(v) => (v.indices.clone(), v.values.clone()).into(),
            };
            builder = builder.add_prefetch(
                PrefetchQueryBuilder::default()
                    .query(vector)
                    .using(leg.field.clone())
                    .limit(leg.limit as u64),
            );
        }

        builder = match &request.query {
            QueryValue::Fusion => builder.query(qdrant_client::qdrant::Fusion::Rrf),
            QueryValue::Vector(VectorValue::Dense(v)) => {
                if let Some(name) = request.use_vector_name {
                    builder = builder.using(name);
                }
                builder.query(v.clone())
            }
            QueryValue::Vector(VectorValue::Sparse(v)) => {
                if let Some(name) = request.use_vector_name {
                    builder = builder.using(name);
                }
                builder.query((v.indices.clone(), v.values.clone()))
            }
        };

        let response = self
            .rt
            .block_on(self.client.query(builder))
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|point| {
                let id = point.id.and_then(|id| id.point_id_options).and_then(|opts| {
                    if let qdrant_client::qdrant::point_id::PointIdOptions::Uuid(s) = opts {
                        uuid::Uuid::parse_str(&s).ok()
                    } else {
                        None
                    }
                })?;
                Some(SearchHit {
                    id,
                    score: point.score,
                    payload: payload_to_metadata(point.payload),
                })
            })
            .collect())
    }

    fn scroll(
        &self,
        collection: &str,
        batch_size: usize,
        offset: Option<String>,
    ) -> Result<(Vec<SearchHit>, Option<String>), StoreError> {
        let mut builder = ScrollPointsBuilder::new(collection)
            .limit(batch_size as u32)
            .with_payload(true)
            .with_vectors(false);
        if let Some(cursor) = &offset {
            builder = builder.offset(cursor.clone());
        }
        let response = self
            .rt
            .block_on(self.client.scroll(builder))
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let hits: Vec<SearchHit> = response
            .result
            .into_iter()
            .filter_map(|point| {
                let id = point.id.and_then(|id| id.point_id_options).and_then(|opts| {
                    if let qdrant_client::qdrant::point_id::PointIdOptions::Uuid(s) = opts {
                        uuid::Uuid::parse_str(&s).ok()
                    } else {
                        None
                    }
                })?;
                Some(SearchHit {
                    id,
                    score: 0.0,
                    payload: payload_to_metadata(point.payload),
                })
            })
            .collect();
        let next_offset = response
            .next_page_offset
            .and_then(|id| id.point_id_options)
            .and_then(|opts| match opts {
                qdrant_client::qdrant::point_id::PointIdOptions::Uuid(s) => Some(s),
                qdrant_client::qdrant::point_id::PointIdOptions::Num(n) => Some(n.to_string()),
            });
        Ok((hits, next_offset))
    }

    fn delete_by_filter(&self, collection: &str, filter: &FilterSpec) -> Result<usize, StoreError> {
        if filter.is_empty() {
            return Ok(0);
        }
        let response = self
            .rt
            .block_on(
                self.client.delete_points(
                    DeletePointsBuilder::new(collection).points(build_filter(filter)),
                ),
            )
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(response.result.map_or(0, |r| r.operation_id as usize))
    }

    fn count(&self, collection: &str) -> Result<usize, StoreError> {
        let info = self
            .rt
            .block_on(self.client.collection_info(collection))
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(info
            .result
            .and_then(|r| r.points_count)
            .unwrap_or(0) as usize)
    }

    fn is_embedded(&self) -> bool {
        false
    }
}
