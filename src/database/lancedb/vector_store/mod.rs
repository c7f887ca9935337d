
use super::{
    CollectionHandle, CollectionSpec, Creation, IndexRecord, RawHit, RecordMetadata,
    is_valid_collection_name,
};
use crate::{Result, SearchError, config::Config};
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt64Array,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use itertools::Itertools;
use lancedb::{
    Connection, DistanceType, Table,
    query::{ExecutableQuery, QueryBase, Select},
};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const ID_COLUMN: &str = "id";
const SEQ_COLUMN: &str = "seq";
const VECTOR_COLUMN: &str = "vector";
const TITLE_COLUMN: &str = "title";
const CHANNEL_COLUMN: &str = "channel";
const BODY_COLUMN: &str = "body";
const DISTANCE_COLUMN: &str = "_distance";

const MODEL_METADATA_KEY: &str = "transcript_search.model";
const DIMENSION_METADATA_KEY: &str = "transcript_search.dimension";
const BUILT_AT_METADATA_KEY: &str = "transcript_search.built_at";

/// Ids per `IN (...)` predicate when probing for duplicates
const ID_LOOKUP_CHUNK: usize = 512;

/// Persistent set of named vector collections.
///
/// Every collection is one LanceDB table. Writes are LanceDB commits, so a
/// call that returns `Ok` has been made durable. Query ordering is by cosine
/// distance, with ties going to the record inserted first.
#[derive(Clone)]
pub struct VectorStore {
    connection: Connection,
}

impl VectorStore {
    /// Open the vector database under the configured base directory
    ///
    /// # Arguments
    /// * `config` - Application configuration containing database paths
    ///
    /// # Returns
    /// * `Result<Self>` - New VectorStore instance, or `StorageFault` if the
    ///   directory or database cannot be opened
    #[inline]
    pub async fn new(config: &Config) -> Result<Self> {
        Self::open(&config.vector_database_path()).await
    }

    #[inline]
    pub async fn open(db_path: &Path) -> Result<Self> {
        debug!("Initializing LanceDB at path: {:?}", db_path);

        std::fs::create_dir_all(db_path).map_err(|e| {
            SearchError::Storage(format!("Failed to create vector database directory: {}", e))
        })?;

        let uri = format!("file://{}", db_path.display());

        let connection = lancedb::connect(&uri).execute().await.map_err(|e| {
            error!("Failed to connect to LanceDB: {}", e);
            SearchError::Storage(format!("Failed to connect to LanceDB: {}", e))
        })?;

        info!("Vector store opened at {:?}", db_path);
        Ok(Self { connection })
    }

    /// Names of every collection in the store
    #[inline]
    pub async fn list_collections(&self) -> Result<Vec<String>> {
        self.connection
            .table_names()
            .execute()
            .await
            .map_err(|e| SearchError::Storage(format!("Failed to list tables: {}", e)))
    }

    #[inline]
    pub async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.list_collections().await?.iter().any(|n| n == name))
    }

    /// Open an existing collection, reading its dimension back from storage
    #[inline]
    pub async fn open_collection(&self, name: &str) -> Result<Option<CollectionHandle>> {
        if !self.collection_exists(name).await? {
            return Ok(None);
        }

        let table = self.open_table(name).await?;
        let schema = table
            .schema()
            .await
            .map_err(|e| SearchError::Storage(format!("Failed to get table schema: {}", e)))?;

        Ok(Some(Self::handle_from_schema(name, &schema)?))
    }

    /// Create an empty collection. Creating one that already exists returns
    /// the existing handle unchanged.
    #[inline]
    pub async fn create_collection(
        &self,
        name: &str,
        spec: &CollectionSpec,
    ) -> Result<CollectionHandle> {
        Self::check_name(name)?;

        if let Some(existing) = self.open_collection(name).await? {
            Self::warn_on_spec_drift(&existing, spec);
            return Ok(existing);
        }

        info!(
            "Creating empty collection '{}' with {} dimensions",
            name, spec.dimension
        );

        let schema = Self::create_schema(spec);
        match self
            .connection
            .create_empty_table(name, schema)
            .execute()
            .await
        {
            Ok(_) => Ok(CollectionHandle::new(
                name,
                spec.dimension,
                Some(spec.model.clone()),
            )),
            Err(lancedb::Error::TableAlreadyExists { .. }) => {
                debug!("Collection '{}' was created concurrently", name);
                self.require_collection(name).await
            }
            Err(e) => Err(SearchError::Storage(format!(
                "Failed to create collection '{}': {}",
                name, e
            ))),
        }
    }

    /// Create a collection together with its full record set in one commit.
    ///
    /// Records are validated in memory before anything is written. If the
    /// commit fails the collection does not exist afterwards. If another
    /// writer created the collection first nothing is written and the
    /// existing handle is returned as [`Creation::Existing`].
    #[inline]
    pub async fn create_collection_with(
        &self,
        name: &str,
        spec: &CollectionSpec,
        records: &[IndexRecord],
    ) -> Result<Creation> {
        Self::check_name(name)?;

        if let Some(existing) = self.open_collection(name).await? {
            return Ok(Creation::Existing(existing));
        }

        Self::check_dimensions(spec.dimension, records)?;
        Self::check_unique_ids(records)?;

        let schema = Self::create_schema(spec);
        let batch = Self::create_record_batch(&schema, records, 0)?;
        let reader = RecordBatchIterator::new(std::iter::once(Ok(batch)), schema);

        info!(
            "Creating collection '{}' with {} records",
            name,
            records.len()
        );

        match self.connection.create_table(name, reader).execute().await {
            Ok(_) => Ok(Creation::Created(CollectionHandle::new(
                name,
                spec.dimension,
                Some(spec.model.clone()),
            ))),
            Err(lancedb::Error::TableAlreadyExists { .. }) => {
                info!("Collection '{}' was built by another writer", name);
                Ok(Creation::Existing(self.require_collection(name).await?))
            }
            Err(e) => {
                error!("Failed to create collection '{}': {}", name, e);
                if let Err(drop_err) = self.drop_collection(name).await {
                    warn!(
                        "Failed to clean up collection '{}' after a failed build: {}",
                        name, drop_err
                    );
                }
                Err(SearchError::Storage(format!(
                    "Failed to create collection '{}': {}",
                    name, e
                )))
            }
        }
    }

    /// Append records to a collection. Ids are taken as given.
    ///
    /// # Errors
    /// * `SchemaFault` if any vector's length differs from the collection's
    /// * `DuplicateIdFault` if an id repeats within the batch or already exists
    /// * `StorageFault` if the write fails
    #[inline]
    pub async fn bulk_insert(
        &self,
        handle: &CollectionHandle,
        records: &[IndexRecord],
    ) -> Result<()> {
        if records.is_empty() {
            debug!("No records to insert");
            return Ok(());
        }

        Self::check_dimensions(handle.dimension(), records)?;
        Self::check_unique_ids(records)?;

        let table = self.open_table(handle.name()).await?;

        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        if let Some(duplicate) = Self::find_existing_ids(&table, &ids).await?.into_iter().next() {
            return Err(SearchError::DuplicateId(duplicate));
        }

        let first_seq = table
            .count_rows(None)
            .await
            .map_err(|e| SearchError::Storage(format!("Failed to count rows: {}", e)))?
            as u64;

        let schema = table
            .schema()
            .await
            .map_err(|e| SearchError::Storage(format!("Failed to get table schema: {}", e)))?;
        let batch = Self::create_record_batch(&schema, records, first_seq)?;
        let reader = RecordBatchIterator::new(std::iter::once(Ok(batch)), schema);

        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| SearchError::Storage(format!("Failed to insert records: {}", e)))?;

        info!(
            "Inserted {} records into collection '{}'",
            records.len(),
            handle.name()
        );
        Ok(())
    }

    /// Nearest-neighbour search by cosine distance
    ///
    /// # Arguments
    /// * `handle` - Collection to search
    /// * `vector` - Query vector, same dimension as the collection
    /// * `top_k` - Maximum number of hits, at least 1
    ///
    /// # Returns
    /// * `Result<Vec<RawHit>>` - Hits in ascending distance order. Empty for
    ///   an empty collection.
    #[inline]
    pub async fn query(
        &self,
        handle: &CollectionHandle,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RawHit>> {
        if top_k == 0 {
            return Err(SearchError::InvalidArgument(
                "top_k must be at least 1".to_string(),
            ));
        }

        if vector.len() != handle.dimension() {
            return Err(SearchError::Schema {
                expected: handle.dimension(),
                actual: vector.len(),
            });
        }

        debug!(
            "Querying collection '{}' with limit: {}",
            handle.name(),
            top_k
        );

        let table = self.open_table(handle.name()).await?;

        let row_count = table
            .count_rows(None)
            .await
            .map_err(|e| SearchError::Storage(format!("Failed to count rows: {}", e)))?;
        if row_count == 0 {
            debug!("Collection '{}' is empty", handle.name());
            return Ok(Vec::new());
        }

        let mut hits = Self::nearest(&table, vector, top_k, None).await?;

        // LanceDB keeps an arbitrary subset of rows tied at the cut. Refetch
        // everything at or below the k-th distance so the earliest inserted win.
        if hits.len() == top_k && row_count > top_k {
            if let Some(cut) = hits
                .last()
                .map(|(_, hit)| hit.distance)
                .filter(|d| d.is_finite())
            {
                let widened =
                    Self::nearest(&table, vector, row_count, Some(cut.next_up())).await?;
                if widened.len() >= top_k {
                    debug!(
                        "Resolved ties at distance {} across {} rows",
                        cut,
                        widened.len()
                    );
                    hits = widened;
                }
            }
        }

        hits.truncate(top_k);

        Ok(hits.into_iter().map(|(_, hit)| hit).collect())
    }

    /// Up to `limit` hits sorted by `(distance, seq)`, optionally only those
    /// strictly closer than `below`
    async fn nearest(
        table: &Table,
        vector: &[f32],
        limit: usize,
        below: Option<f32>,
    ) -> Result<Vec<(u64, RawHit)>> {
        let mut search = table
            .vector_search(vector)
            .map_err(|e| SearchError::Storage(format!("Failed to create vector search: {}", e)))?
            .column(VECTOR_COLUMN)
            .distance_type(DistanceType::Cosine)
            .limit(limit);
        if below.is_some() {
            search = search.distance_range(None, below);
        }

        let results = search
            .execute()
            .await
            .map_err(|e| SearchError::Storage(format!("Failed to execute search: {}", e)))?;

        let mut hits = Self::parse_search_results_stream(results).await?;
        hits.sort_by(|(seq_a, a), (seq_b, b)| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| seq_a.cmp(seq_b))
        });
        Ok(hits)
    }

    /// Get the number of records in a collection
    #[inline]
    pub async fn count_records(&self, handle: &CollectionHandle) -> Result<usize> {
        let table = self.open_table(handle.name()).await?;

        table
            .count_rows(None)
            .await
            .map_err(|e| SearchError::Storage(format!("Failed to count rows: {}", e)))
    }

    /// Drop a collection if it exists
    #[inline]
    pub async fn drop_collection(&self, name: &str) -> Result<()> {
        if self.collection_exists(name).await? {
            info!("Dropping collection '{}'", name);
            self.connection
                .drop_table(name)
                .await
                .map_err(|e| SearchError::Storage(format!("Failed to drop table: {}", e)))?;
        }

        Ok(())
    }

    /// Build timestamp recorded when the collection was created, if any
    #[inline]
    pub async fn built_at(&self, handle: &CollectionHandle) -> Result<Option<String>> {
        let table = self.open_table(handle.name()).await?;
        let schema = table
            .schema()
            .await
            .map_err(|e| SearchError::Storage(format!("Failed to get table schema: {}", e)))?;

        Ok(schema.metadata().get(BUILT_AT_METADATA_KEY).cloned())
    }

    async fn open_table(&self, name: &str) -> Result<Table> {
        self.connection
            .open_table(name)
            .execute()
            .await
            .map_err(|e| match e {
                lancedb::Error::TableNotFound { .. } => {
                    SearchError::NotFound(format!("collection '{}'", name))
                }
                other => SearchError::Storage(format!("Failed to open table: {}", other)),
            })
    }

    async fn require_collection(&self, name: &str) -> Result<CollectionHandle> {
        self.open_collection(name)
            .await?
            .ok_or_else(|| SearchError::NotFound(format!("collection '{}'", name)))
    }

    fn check_name(name: &str) -> Result<()> {
        if is_valid_collection_name(name) {
            Ok(())
        } else {
            Err(SearchError::InvalidArgument(format!(
                "invalid collection name '{}'",
                name
            )))
        }
    }

    fn check_dimensions(expected: usize, records: &[IndexRecord]) -> Result<()> {
        match records.iter().find(|r| r.vector.len() != expected) {
            Some(record) => {
                warn!(
                    "Record {} has {} dimensions, collection expects {}",
                    record.id,
                    record.vector.len(),
                    expected
                );
                Err(SearchError::Schema {
                    expected,
                    actual: record.vector.len(),
                })
            }
            None => Ok(()),
        }
    }

    fn check_unique_ids(records: &[IndexRecord]) -> Result<()> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in records {
            if !seen.insert(record.id.as_str()) {
                return Err(SearchError::DuplicateId(record.id.clone()));
            }
        }
        Ok(())
    }

    async fn find_existing_ids(table: &Table, ids: &[&str]) -> Result<Vec<String>> {
        let mut found = Vec::new();

        for chunk in ids.chunks(ID_LOOKUP_CHUNK) {
            let predicate = format!(
                "{} IN ({})",
                ID_COLUMN,
                chunk
                    .iter()
                    .map(|id| format!("'{}'", id.replace('\'', "''")))
                    .join(", ")
            );

            let mut stream = table
                .query()
                .only_if(predicate)
                .select(Select::columns(&[ID_COLUMN]))
                .execute()
                .await
                .map_err(|e| SearchError::Storage(format!("Failed to look up ids: {}", e)))?;

            while let Some(batch) = stream
                .try_next()
                .await
                .map_err(|e| SearchError::Storage(format!("Failed to read id stream: {}", e)))?
            {
                let column = Self::string_column(&batch, ID_COLUMN)?;
                found.extend((0..batch.num_rows()).map(|row| column.value(row).to_string()));
            }
        }

        Ok(found)
    }

    fn warn_on_spec_drift(existing: &CollectionHandle, spec: &CollectionSpec) {
        if existing.dimension() != spec.dimension {
            warn!(
                "Collection '{}' holds {}-dimensional vectors, requested {}",
                existing.name(),
                existing.dimension(),
                spec.dimension
            );
        }
        if existing.model().is_some_and(|model| model != spec.model) {
            warn!(
                "Collection '{}' was built with model {:?}, now using '{}'",
                existing.name(),
                existing.model(),
                spec.model
            );
        }
    }

    /// Create schema for a new collection, carrying its model and dimension
    fn create_schema(spec: &CollectionSpec) -> SchemaRef {
        let metadata = HashMap::from([
            (MODEL_METADATA_KEY.to_string(), spec.model.clone()),
            (DIMENSION_METADATA_KEY.to_string(), spec.dimension.to_string()),
            (
                BUILT_AT_METADATA_KEY.to_string(),
                chrono::Utc::now().to_rfc3339(),
            ),
        ]);

        Arc::new(Schema::new_with_metadata(
            vec![
                Field::new(ID_COLUMN, DataType::Utf8, false),
                Field::new(SEQ_COLUMN, DataType::UInt64, false),
                Field::new(
                    VECTOR_COLUMN,
                    DataType::FixedSizeList(
                        Arc::new(Field::new("item", DataType::Float32, true)),
                        spec.dimension as i32,
                    ),
                    false,
                ),
                Field::new(TITLE_COLUMN, DataType::Utf8, false),
                Field::new(CHANNEL_COLUMN, DataType::Utf8, false),
                Field::new(BODY_COLUMN, DataType::Utf8, false),
            ],
            metadata,
        ))
    }

    fn handle_from_schema(name: &str, schema: &Schema) -> Result<CollectionHandle> {
        let dimension = match schema
            .field_with_name(VECTOR_COLUMN)
            .map(|field| field.data_type())
        {
            Ok(DataType::FixedSizeList(_, size)) => *size as usize,
            _ => {
                return Err(SearchError::Storage(format!(
                    "Collection '{}' has no fixed-size vector column",
                    name
                )));
            }
        };

        if let Some(recorded) = schema.metadata().get(DIMENSION_METADATA_KEY) {
            if recorded.parse::<usize>().ok() != Some(dimension) {
                warn!(
                    "Collection '{}' records dimension {} but stores {}",
                    name, recorded, dimension
                );
            }
        }

        Ok(CollectionHandle::new(
            name,
            dimension,
            schema.metadata().get(MODEL_METADATA_KEY).cloned(),
        ))
    }

    /// Create a RecordBatch matching `schema`, numbering rows from `first_seq`
    fn create_record_batch(
        schema: &SchemaRef,
        records: &[IndexRecord],
        first_seq: u64,
    ) -> Result<RecordBatch> {
        let (item_field, vector_dim) = match schema
            .field_with_name(VECTOR_COLUMN)
            .map(|field| field.data_type())
        {
            Ok(DataType::FixedSizeList(item, size)) => (Arc::clone(item), *size),
            _ => {
                return Err(SearchError::Storage(
                    "Schema has no fixed-size vector column".to_string(),
                ));
            }
        };

        let len = records.len();
        let mut ids = Vec::with_capacity(len);
        let mut seqs = Vec::with_capacity(len);
        let mut titles = Vec::with_capacity(len);
        let mut channels = Vec::with_capacity(len);
        let mut bodies = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * vector_dim as usize);

        for (offset, record) in (0_u64..).zip(records) {
            ids.push(record.id.as_str());
            seqs.push(first_seq + offset);
            titles.push(record.metadata.title.as_str());
            channels.push(record.metadata.channel.as_str());
            bodies.push(record.body.as_str());
            flat_values.extend_from_slice(&record.vector);
        }

        let vector_array = FixedSizeListArray::try_new(
            item_field,
            vector_dim,
            Arc::new(Float32Array::from(flat_values)),
            None,
        )
        .map_err(|e| SearchError::Storage(format!("Failed to create vector array: {}", e)))?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(UInt64Array::from(seqs)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(titles)),
            Arc::new(StringArray::from(channels)),
            Arc::new(StringArray::from(bodies)),
        ];

        RecordBatch::try_new(Arc::clone(schema), arrays)
            .map_err(|e| SearchError::Storage(format!("Failed to create record batch: {}", e)))
    }

    /// Parse search results from LanceDB stream, keeping each hit's insertion ordinal
    async fn parse_search_results_stream(
        mut results: lancedb::arrow::SendableRecordBatchStream,
    ) -> Result<Vec<(u64, RawHit)>> {
        let mut hits = Vec::new();

        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| SearchError::Storage(format!("Failed to read result stream: {}", e)))?
        {
            hits.extend(Self::parse_search_batch(&batch)?);
        }

        debug!("Parsed {} search results from stream", hits.len());
        Ok(hits)
    }

    fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<(u64, RawHit)>> {
        let ids = Self::string_column(batch, ID_COLUMN)?;
        let titles = Self::string_column(batch, TITLE_COLUMN)?;
        let channels = Self::string_column(batch, CHANNEL_COLUMN)?;
        let bodies = Self::string_column(batch, BODY_COLUMN)?;

        let seqs = batch
            .column_by_name(SEQ_COLUMN)
            .ok_or_else(|| SearchError::Storage("Missing seq column".to_string()))?
            .as_any()
            .downcast_ref::<UInt64Array>()
            .ok_or_else(|| SearchError::Storage("Invalid seq column type".to_string()))?;

        let distances = batch
            .column_by_name(DISTANCE_COLUMN)
            .ok_or_else(|| SearchError::Storage("Missing distance column".to_string()))?
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| SearchError::Storage("Invalid distance column type".to_string()))?;

        Ok((0..batch.num_rows())
            .map(|row| {
                let hit = RawHit {
                    id: ids.value(row).to_string(),
                    // Zero-norm vectors come back as NaN
                    distance: if distances.is_null(row) || distances.value(row).is_nan() {
                        f32::INFINITY
                    } else {
                        distances.value(row)
                    },
                    metadata: RecordMetadata {
                        title: titles.value(row).to_string(),
                        channel: channels.value(row).to_string(),
                    },
                    body: bodies.value(row).to_string(),
                };
                (seqs.value(row), hit)
            })
            .collect())
    }

    fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
        batch
            .column_by_name(name)
            .ok_or_else(|| SearchError::Storage(format!("Missing {} column", name)))?
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| SearchError::Storage(format!("Invalid {} column type", name)))
    }
}
