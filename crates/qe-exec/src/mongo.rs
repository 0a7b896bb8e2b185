//! Document executor, backed by the official `mongodb` driver (§4.6).
//! Decodes BSON documents into the same `(column, Scalar)` row shape the
//! relational executor produces, so callers never see which backend
//! answered a request.

use bson::{Bson, Document};
use futures_util::TryStreamExt;
use mongodb::Database as MongoDatabase;
use qe_core::ir::Scalar;
use qe_doc::{CommandOp, DocumentCommand};

use crate::error::{ExecError, ExecResult};
use crate::traits::{CommandOutcome, ExecutionRequest, Executor, Row};

pub struct MongoExecutor {
    database: MongoDatabase,
}

impl MongoExecutor {
    pub fn new(database: MongoDatabase) -> Self {
        Self { database }
    }
}

#[async_trait::async_trait]
impl Executor for MongoExecutor {
    async fn execute_query(&self, request: &ExecutionRequest) -> ExecResult<Vec<Row>> {
        let command = as_document_command(request)?;
        let collection = self.database.collection::<Document>(&command.collection);

        match command.operation {
            CommandOp::Find => {
                let filter = optional_document(command.filter.as_ref())?.unwrap_or_default();
                let mut finder = collection.find(filter);
                if let Some(options) = &command.options {
                    if let Some(limit) = options.get("limit").and_then(|v| v.as_i64()) {
                        finder = finder.limit(limit);
                    }
                    if let Some(skip) = options.get("skip").and_then(|v| v.as_u64()) {
                        finder = finder.skip(skip);
                    }
                    if let Some(sort) = options.get("sort") {
                        finder = finder.sort(json_to_document(sort)?);
                    }
                }
                let mut cursor = finder.await?;
                let mut rows = Vec::new();
                while let Some(doc) = cursor.try_next().await? {
                    rows.push(document_to_row(&doc));
                }
                Ok(rows)
            }
            CommandOp::Aggregate => {
                let pipeline = command
                    .pipeline
                    .as_ref()
                    .map(|stages| {
                        stages
                            .iter()
                            .map(json_to_document)
                            .collect::<ExecResult<Vec<_>>>()
                    })
                    .transpose()?
                    .unwrap_or_default();
                let mut cursor = collection.aggregate(pipeline).await?;
                let mut rows = Vec::new();
                while let Some(doc) = cursor.try_next().await? {
                    rows.push(document_to_row(&doc));
                }
                Ok(rows)
            }
            _ => Err(ExecError::Query(
                "execute_query received a non-read command".to_string(),
            )),
        }
    }

    async fn execute_command(&self, request: &ExecutionRequest) -> ExecResult<CommandOutcome> {
        let command = as_document_command(request)?;
        let collection = self.database.collection::<Document>(&command.collection);

        match command.operation {
            CommandOp::Insert => {
                let document = command.document.as_ref().ok_or_else(|| {
                    ExecError::Query("insert command missing document".to_string())
                })?;
                let mut doc = json_to_document(document)?;
                let result = collection.insert_one(doc.clone()).await?;
                doc.insert("_id", result.inserted_id);
                Ok(CommandOutcome {
                    affected_rows: 1,
                    returned: vec![document_to_row(&doc)],
                })
            }
            CommandOp::Update => {
                let filter = optional_document(command.filter.as_ref())?.unwrap_or_default();
                let update_spec = command
                    .update
                    .as_ref()
                    .ok_or_else(|| ExecError::Query("update command missing update".to_string()))?;
                let update = json_to_document(update_spec)?;
                let result = collection.update_many(filter, update).await?;
                Ok(CommandOutcome {
                    affected_rows: result.modified_count as usize,
                    returned: Vec::new(),
                })
            }
            CommandOp::Delete => {
                let filter = optional_document(command.filter.as_ref())?.unwrap_or_default();
                let result = collection.delete_many(filter).await?;
                Ok(CommandOutcome {
                    affected_rows: result.deleted_count as usize,
                    returned: Vec::new(),
                })
            }
            _ => Err(ExecError::Query(
                "execute_command received a non-write command".to_string(),
            )),
        }
    }

    fn backend_type(&self) -> &'static str {
        "mongo"
    }
}

fn as_document_command(request: &ExecutionRequest) -> ExecResult<&DocumentCommand> {
    match request {
        ExecutionRequest::Document(c) => Ok(c),
        ExecutionRequest::Sql { .. } => Err(ExecError::Query(
            "document executor received a relational command".to_string(),
        )),
    }
}

fn json_to_document(value: &serde_json::Value) -> ExecResult<Document> {
    match bson::to_bson(value).map_err(|e| ExecError::Query(e.to_string()))? {
        Bson::Document(doc) => Ok(doc),
        _ => Err(ExecError::Query(
            "expected a document-shaped value".to_string(),
        )),
    }
}

fn optional_document(value: Option<&serde_json::Value>) -> ExecResult<Option<Document>> {
    value.map(json_to_document).transpose()
}

fn document_to_row(doc: &Document) -> Row {
    doc.iter()
        .map(|(key, value)| (key.clone(), bson_to_scalar(value)))
        .collect()
}

fn bson_to_scalar(value: &Bson) -> Scalar {
    match value {
        Bson::Null => Scalar::Null,
        Bson::Boolean(b) => Scalar::Bool(*b),
        Bson::Int32(i) => Scalar::Int(*i as i64),
        Bson::Int64(i) => Scalar::Int(*i),
        Bson::Double(f) => Scalar::Float(*f),
        Bson::String(s) => Scalar::Text(s.clone()),
        Bson::Binary(bin) => Scalar::Bytes(bin.bytes.clone()),
        Bson::DateTime(dt) => Scalar::Timestamp(dt.to_chrono().naive_utc()),
        Bson::ObjectId(oid) => Scalar::Text(oid.to_hex()),
        Bson::Document(doc) => {
            Scalar::Json(Bson::Document(doc.clone()).into_relaxed_extjson())
        }
        Bson::Array(arr) => Scalar::Json(Bson::Array(arr.clone()).into_relaxed_extjson()),
        other => Scalar::Text(other.to_string()),
    }
}
