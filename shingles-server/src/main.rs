use std::sync::Mutex;

use actix_web::{App, HttpResponse, HttpServer, Responder, get, put, web};

use serde::Deserialize;
use shingles_core::io::{list_models, model_path};
use shingles_core::{Dictionary, GeneratorConfig, parser};
use tracing::{info, warn};

/// Folder holding the `.json` models.
const DATA_FOLDER: &str = "./data";

/// Query parameters carrying an optional seed text
#[derive(Deserialize)]
struct SeedQuery {
	seed: Option<String>,
}

#[derive(Deserialize)]
struct ModelQuery {
	name: Option<String>,
}

struct SharedData {
	dictionary: Dictionary,
}

impl SeedQuery {
	fn seed(&self) -> &str {
		self.seed.as_deref().unwrap_or("")
	}
}

impl ModelQuery {
	/// Resolves the model file, rejecting missing or unsafe names.
	fn path(&self) -> Result<std::path::PathBuf, String> {
		match &self.name {
			Some(name) if !name.trim().is_empty() => model_path(DATA_FOLDER, name, "json").map_err(|e| e.to_string()),
			_ => Err("Missing or empty model name".into()),
		}
	}
}

/// HTTP GET endpoint `/v1/generate`
///
/// Generates a sentence continuing the optional `seed`.
/// An empty body means generation hit a dead end.
#[get("/v1/generate")]
async fn get_generated(data: web::Data<Mutex<SharedData>>, query: web::Query<SeedQuery>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	HttpResponse::Ok().body(shared_data.dictionary.generate(query.seed()))
}

/// HTTP GET endpoint `/v1/next`
///
/// Most probable word following `seed`.
#[get("/v1/next")]
async fn get_next(data: web::Data<Mutex<SharedData>>, query: web::Query<SeedQuery>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	match shared_data.dictionary.next_most_probable_word(query.seed()) {
		Some(word) => HttpResponse::Ok().body(word),
		None => HttpResponse::NotFound().body("No continuation known"),
	}
}

/// HTTP GET endpoint `/v1/candidates`
///
/// Words that may follow `seed`, most probable first, one per line.
#[get("/v1/candidates")]
async fn get_candidates(data: web::Data<Mutex<SharedData>>, query: web::Query<SeedQuery>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	HttpResponse::Ok().body(shared_data.dictionary.next_candidate_words(query.seed()).join("\n"))
}

/// HTTP PUT endpoint `/v1/ingest`
///
/// Tokenizes the request body, ingests it and recomputes probabilities.
/// Returns the number of sentences indexed.
#[put("/v1/ingest")]
async fn put_ingest(data: web::Data<Mutex<SharedData>>, body: String) -> impl Responder {
	let tokens = parser::parse(&body);

	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	let sentences = shared_data.dictionary.ingest(tokens.as_slice());
	shared_data.dictionary.recompute_probabilities();
	info!(sentences, tokens = tokens.len(), "text ingested");
	HttpResponse::Ok().body(sentences.to_string())
}

#[get("/v1/models")]
async fn get_models() -> impl Responder {
	match list_models(DATA_FOLDER, "json") {
		Ok(names) => HttpResponse::Ok().body(names.join("\n")),
		Err(_) => HttpResponse::InternalServerError().body("Failed to list models"),
	}
}

/// HTTP PUT endpoint `/v1/load_model`
///
/// Replaces the current model; on failure the current one is kept.
#[put("/v1/load_model")]
async fn put_load_model(data: web::Data<Mutex<SharedData>>, query: web::Query<ModelQuery>) -> impl Responder {
	let path = match query.path() {
		Ok(p) => p,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};

	let loaded = match Dictionary::load(&path) {
		Ok(d) => d,
		Err(e) => {
			warn!(path = %path.display(), error = %e, "model load failed");
			return HttpResponse::InternalServerError().body(format!("Failed to load model: {e}"));
		}
	};

	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	shared_data.dictionary = loaded;

	HttpResponse::Ok().body("Model loaded successfully")
}

/// HTTP PUT endpoint `/v1/save_model`
#[put("/v1/save_model")]
async fn put_save_model(data: web::Data<Mutex<SharedData>>, query: web::Query<ModelQuery>) -> impl Responder {
	let path = match query.path() {
		Ok(p) => p,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};

	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	match shared_data.dictionary.save(&path) {
		Ok(()) => HttpResponse::Ok().body("Model saved successfully"),
		Err(e) => HttpResponse::InternalServerError().body(format!("Failed to save model: {e}")),
	}
}

/// Main entry point for the server.
///
/// Starts with an empty order-3 model wrapped in a `Mutex`, shared by every
/// handler through `web::Data`.
///
/// # Notes
/// - The server binds to 127.0.0.1:5000.
/// - Models are read from and written to `./data`.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	shingles_core::init_tracing();

	let shared_data = SharedData {
		dictionary: Dictionary::new(GeneratorConfig::default()),
	};
	let shared_model = web::Data::new(Mutex::new(shared_data));

	info!("listening on 127.0.0.1:5000");
	HttpServer::new(move || {
		App::new()
			.app_data(shared_model.clone())
			.service(get_generated)
			.service(get_next)
			.service(get_candidates)
			.service(put_ingest)
			.service(get_models)
			.service(put_load_model)
			.service(put_save_model)
	})
		.bind(("127.0.0.1", 5000))?
		.run()
		.await
}
