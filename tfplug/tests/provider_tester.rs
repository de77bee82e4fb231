//! Drives a small in-memory provider through ProviderTester

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tfplug::context::Context;
use tfplug::data_source::*;
use tfplug::defaults::StaticDefault;
use tfplug::provider::*;
use tfplug::resource::*;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::testing::ProviderTester;
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::StringOneOf;

type Store = Arc<Mutex<HashMap<String, NoteModel>>>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct NoteModel {
    id: Option<String>,
    text: String,
    color: String,
}

fn note_schema() -> Schema {
    SchemaBuilder::new()
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("text", AttributeType::String)
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("color", AttributeType::String)
                .validator(StringOneOf::create(&["yellow", "blue"]))
                .default(StaticDefault::string("yellow"))
                .build(),
        )
        .build()
}

#[derive(Default)]
struct NoteResource {
    store: Option<Store>,
}

impl NoteResource {
    fn store(&self) -> Result<&Store, Vec<Diagnostic>> {
        self.store
            .as_ref()
            .ok_or_else(|| vec![Diagnostic::error("Provider not configured", "no store")])
    }

    fn write(&self, config: &DynamicValue, id: String) -> Result<DynamicValue, Vec<Diagnostic>> {
        let mut note: NoteModel = note_schema().decode(config)?;
        note.id = Some(id.clone());
        self.store()?
            .lock()
            .unwrap()
            .insert(id, note.clone());
        DynamicValue::from_serialize(&note)
            .map_err(|e| vec![Diagnostic::error("Encoding failed", e.to_string())])
    }
}

#[async_trait]
impl Resource for NoteResource {
    fn type_name(&self) -> &str {
        "memo_note"
    }

    async fn metadata(&self, _: Context, _: ResourceMetadataRequest) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(&self, _: Context, _: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: note_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: note_schema().validate(&request.config),
        }
    }

    async fn create(&self, _: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let id = format!("note-{}", self.store.as_ref().map_or(0, |s| s.lock().unwrap().len()));
        match self.write(&request.config, id) {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(diagnostics) => CreateResourceResponse {
                new_state: DynamicValue::null(),
                diagnostics,
            },
        }
    }

    async fn read(&self, _: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let id = request
            .current_state
            .get_string(&AttributePath::new("id"))
            .unwrap_or_default();
        let note = self
            .store
            .as_ref()
            .and_then(|s| s.lock().unwrap().get(&id).cloned());

        ReadResourceResponse {
            new_state: note.and_then(|n| DynamicValue::from_serialize(&n).ok()),
            diagnostics: vec![],
        }
    }

    async fn update(&self, _: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let id = request
            .prior_state
            .get_string(&AttributePath::new("id"))
            .unwrap_or_default();
        match self.write(&request.config, id) {
            Ok(new_state) => UpdateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(diagnostics) => UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            },
        }
    }

    async fn delete(&self, _: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let id = request
            .prior_state
            .get_string(&AttributePath::new("id"))
            .unwrap_or_default();
        if let Some(store) = &self.store {
            store.lock().unwrap().remove(&id);
        }
        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for NoteResource {
    async fn configure(
        &mut self,
        _: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        self.store = request
            .provider_data
            .and_then(|data| data.downcast_ref::<Store>().cloned());
        ConfigureResourceResponse {
            diagnostics: vec![],
        }
    }
}

#[derive(Default)]
struct CountDataSource {
    store: Option<Store>,
}

#[async_trait]
impl DataSource for CountDataSource {
    fn type_name(&self) -> &str {
        "memo_count"
    }

    async fn metadata(
        &self,
        _: Context,
        _: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(&self, _: Context, _: DataSourceSchemaRequest) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: SchemaBuilder::new()
                .attribute(
                    AttributeBuilder::new("count", AttributeType::Number)
                        .computed()
                        .build(),
                )
                .build(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _: Context,
        _: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn read(&self, _: Context, _: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let count = self.store.as_ref().map_or(0, |s| s.lock().unwrap().len());
        ReadDataSourceResponse {
            state: DynamicValue::from_json(json!({ "count": count })),
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for CountDataSource {
    async fn configure(
        &mut self,
        _: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        self.store = request
            .provider_data
            .and_then(|data| data.downcast_ref::<Store>().cloned());
        ConfigureDataSourceResponse {
            diagnostics: vec![],
        }
    }
}

struct MemoProvider;

#[async_trait]
impl Provider for MemoProvider {
    fn type_name(&self) -> &str {
        "memo"
    }

    async fn metadata(&self, _: Context, _: ProviderMetadataRequest) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: "memo".to_string(),
        }
    }

    async fn schema(&self, _: Context, _: ProviderSchemaRequest) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: SchemaBuilder::new().build(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _: Context,
        _: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _: Context,
        _: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let store: Store = Arc::new(Mutex::new(HashMap::new()));
        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: Some(Arc::new(store) as Arc<dyn Any + Send + Sync>),
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert(
            "memo_note".to_string(),
            Box::new(|| Box::new(NoteResource::default()) as Box<dyn ResourceWithConfigure>),
        );
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories: HashMap<String, DataSourceFactory> = HashMap::new();
        factories.insert(
            "memo_count".to_string(),
            Box::new(|| Box::new(CountDataSource::default()) as Box<dyn DataSourceWithConfigure>),
        );
        factories
    }
}

#[tokio::test]
async fn resource_lifecycle_through_tester() {
    let mut tester = ProviderTester::new(MemoProvider);
    tester.configure(json!({})).await.unwrap();

    let state = tester
        .create("memo_note", json!({ "text": "buy milk" }))
        .await
        .unwrap();
    assert_eq!(state["id"], "note-0");
    assert_eq!(state["color"], "yellow");

    let read = tester.read("memo_note", state.clone()).await.unwrap();
    assert_eq!(read, Some(state.clone()));

    let updated = tester
        .update(
            "memo_note",
            state.clone(),
            json!({ "text": "buy milk", "color": "blue" }),
        )
        .await
        .unwrap();
    assert_eq!(updated["color"], "blue");

    let count = tester.read_data_source("memo_count", json!({})).await.unwrap();
    assert_eq!(count["count"], 1);

    tester.delete("memo_note", updated.clone()).await.unwrap();
    assert_eq!(tester.read("memo_note", updated).await.unwrap(), None);
}

#[tokio::test]
async fn invalid_config_surfaces_diagnostics() {
    let mut tester = ProviderTester::new(MemoProvider);
    tester.configure(json!({})).await.unwrap();

    let err = tester
        .create("memo_note", json!({ "text": "x", "color": "red" }))
        .await
        .unwrap_err();
    assert_eq!(
        err.diagnostics()[0].attribute,
        Some(AttributePath::new("color"))
    );

    assert!(tester
        .validate_resource_config("memo_note", json!({}))
        .await
        .is_err());
}

#[tokio::test]
async fn unknown_types_and_default_import() {
    let mut tester = ProviderTester::new(MemoProvider);
    tester.configure(json!({})).await.unwrap();

    assert!(matches!(
        tester.create("memo_missing", json!({})).await,
        Err(tfplug::testing::TestError::UnknownType(_))
    ));

    let err = tester.import("memo_note", "note-0").await.unwrap_err();
    assert_eq!(err.diagnostics()[0].summary, "Resource import not supported");
}
