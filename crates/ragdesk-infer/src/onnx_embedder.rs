//! Sentence embeddings from all-MiniLM-L6-v2 exported to ONNX.
//!
//! Needs the `onnx` feature, plus `model.onnx` and `tokenizer.json` in the
//! model directory. Produces 384-dimensional mean-pooled float32 vectors.

#[cfg(feature = "onnx")]
mod inner {
    use std::path::Path;

    use ndarray::Array1;
    use ort::session::Session;
    use ort::value::Tensor;
    use parking_lot::Mutex;
    use tokenizers::Tokenizer;
    use tracing::{info, warn};

    use crate::cache::EmbeddingCache;
    use crate::embedder::{EmbedderBackend, EmbeddingResult};

    /// Longest token sequence the model accepts.
    const MAX_SEQ_LEN: usize = 256;
    /// Output width of all-MiniLM-L6-v2.
    const MODEL_DIM: usize = 384;
    const CACHE_CAPACITY: usize = 1024;

    pub struct OnnxEmbedder {
        session: Mutex<Session>,
        tokenizer: Tokenizer,
        cache: EmbeddingCache,
    }

    impl OnnxEmbedder {
        /// Load `model.onnx` and `tokenizer.json` from `model_dir`.
        ///
        /// With `load-dynamic`, `ORT_DYLIB_PATH` must point at libonnxruntime.
        pub fn load(model_dir: &Path) -> Result<Self, String> {
            let model_path = model_dir.join("model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");

            if !model_path.exists() {
                return Err(format!("Model not found: {}", model_path.display()));
            }
            if !tokenizer_path.exists() {
                return Err(format!("Tokenizer not found: {}", tokenizer_path.display()));
            }

            ort::init().commit();

            let session = Session::builder()
                .map_err(|e| format!("Failed to create session builder: {}", e))?
                .with_intra_threads(2)
                .map_err(|e| format!("Failed to set threads: {}", e))?
                .commit_from_file(&model_path)
                .map_err(|e| format!("Failed to load ONNX model: {}", e))?;

            let tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| format!("Failed to load tokenizer: {}", e))?;

            info!("Loaded sentence model from {}", model_dir.display());

            Ok(Self {
                session: Mutex::new(session),
                tokenizer,
                cache: EmbeddingCache::new(CACHE_CAPACITY),
            })
        }

        fn infer(&self, text: &str) -> Option<Array1<f32>> {
            let encoding = self
                .tokenizer
                .encode(text, true)
                .map_err(|e| warn!("Tokenization failed: {}", e))
                .ok()?;

            let seq_len = encoding.get_ids().len().min(MAX_SEQ_LEN);
            let ids: Vec<i64> = encoding.get_ids()[..seq_len]
                .iter()
                .map(|&id| id as i64)
                .collect();
            let mask: Vec<i64> = encoding.get_attention_mask()[..seq_len]
                .iter()
                .map(|&m| m as i64)
                .collect();
            let type_ids = vec![0i64; seq_len];

            let tensor = |name: &str, data: Vec<i64>| {
                Tensor::from_array(([1usize, seq_len], data))
                    .map_err(|e| warn!("Failed to build {} tensor: {}", name, e))
                    .ok()
            };
            let ids_tensor = tensor("input_ids", ids)?;
            let mask_tensor = tensor("attention_mask", mask.clone())?;
            let type_tensor = tensor("token_type_ids", type_ids)?;

            let mut session = self.session.lock();
            let outputs = session
                .run(ort::inputs![ids_tensor, mask_tensor, type_tensor])
                .map_err(|e| warn!("ONNX inference failed: {}", e))
                .ok()?;

            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| warn!("Failed to read model output: {}", e))
                .ok()?;
            let dims: Vec<i64> = shape.iter().copied().collect();

            match dims.as_slice() {
                // [1, seq_len, dim]: token embeddings, mean-pooled over the mask.
                [1, _, dim] => {
                    let dim = *dim as usize;
                    let weight: f32 = mask.iter().map(|&m| m as f32).sum();
                    if weight < 1.0 {
                        return None;
                    }
                    let mut pooled = Array1::<f32>::zeros(dim);
                    for (token, &m) in mask.iter().enumerate() {
                        if m == 0 {
                            continue;
                        }
                        let row = &data[token * dim..(token + 1) * dim];
                        pooled
                            .iter_mut()
                            .zip(row)
                            .for_each(|(acc, &x)| *acc += x);
                    }
                    Some(pooled / weight)
                }
                // [1, dim]: already a sentence embedding.
                [1, dim] => Some(Array1::from_vec(data[..*dim as usize].to_vec())),
                other => {
                    warn!("Unexpected model output shape: {:?}", other);
                    None
                }
            }
        }
    }

    impl EmbedderBackend for OnnxEmbedder {
        fn embed(&self, text: &str) -> Option<EmbeddingResult> {
            if let Some(cached) = self.cache.get(text) {
                return Some(EmbeddingResult {
                    embedding: cached,
                    cached: true,
                });
            }

            let embedding = self.infer(text)?;
            self.cache.put(text.to_string(), embedding.clone());

            Some(EmbeddingResult {
                embedding,
                cached: false,
            })
        }

        fn dimension(&self) -> usize {
            MODEL_DIM
        }

        fn is_available(&self) -> bool {
            true
        }
    }
}

#[cfg(feature = "onnx")]
pub use inner::OnnxEmbedder;
