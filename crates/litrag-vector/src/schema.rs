use arrow_array::types::Float32Type;
use arrow_array::{FixedSizeListArray, Int32Array, RecordBatch, StringArray};
use arrow_schema::{ArrowError, DataType, Field, Schema};
use std::sync::Arc;

use litrag_core::types::Chunk;

pub fn build_arrow_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("doc_id", DataType::Utf8, false),
        Field::new("chunk_index", DataType::Int32, false),
        Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
    ]))
}

pub fn chunks_to_record_batch(chunks: &[Chunk], dim: i32) -> Result<RecordBatch, ArrowError> {
    let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
    let doc_ids: Vec<&str> = chunks.iter().map(|c| c.doc_id.as_str()).collect();
    let chunk_indices: Vec<i32> = chunks.iter().map(|c| c.chunk_index as i32).collect();
    let vectors = chunks.iter().map(|c| Some(c.embedding.iter().map(|&x| Some(x)).collect::<Vec<_>>()));
    RecordBatch::try_new(build_arrow_schema(dim), vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(StringArray::from(doc_ids)),
        Arc::new(Int32Array::from(chunk_indices)),
        Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, dim)),
    ])
}
