//! Integration tests for tool calling
//!
//! A scripted model requests tools; the dispatcher runs them against the
//! real pet, light and traffic tool sets.

use serde_json::json;
use std::sync::Arc;

use geminibuddy::ontology::{LicenseStatus, NewVehicle, OntologyStore, ViolationCheck};
use geminibuddy::providers::{Content, FunctionCall, Role, ScriptedModel};
use geminibuddy::tools::implementations::{
    light_tools, ontology_tools, pet_tools, LightContext, LightStatus, OntologyContext, PetContext,
    PET_SYSTEM_PROMPT,
};
use geminibuddy::tools::ToolDispatcher;
use tempfile::TempDir;

fn call(name: &str, args: serde_json::Value) -> Content {
    ScriptedModel::call_turn(vec![FunctionCall::new(name, args)])
}

#[tokio::test]
async fn test_pet_name_remembered_across_turns() {
    let model = Arc::new(ScriptedModel::new(vec![
        Ok(call("save_pet_info", json!({"name": "Rex"}))),
        Ok(Content::model("Nice to meet Rex!")),
        Ok(call("get_pet_name", json!({}))),
        Ok(Content::model("Your dog is called Rex.")),
    ]));
    let mut dispatcher = ToolDispatcher::new(model.clone(), pet_tools()).with_system_instruction(PET_SYSTEM_PROMPT);
    let mut pets = PetContext::default();

    let first = dispatcher.send(&mut pets, "My dog's name is Rex").await.unwrap();
    assert_eq!(first.reply, "Nice to meet Rex!");
    assert_eq!(pets.name.as_deref(), Some("Rex"));

    let second = dispatcher.send(&mut pets, "What is my dog's name?").await.unwrap();
    assert_eq!(second.reply, "Your dog is called Rex.");
    assert_eq!(second.invocations.len(), 1);
    assert_eq!(second.invocations[0].result.output, json!({"status": "ok", "name": "Rex"}));

    // the model sees the whole conversation and the declared tools
    let requests = model.requests();
    let last = requests.last().unwrap();
    assert_eq!(last.system_instruction.as_deref(), Some(PET_SYSTEM_PROMPT));
    assert_eq!(last.tools.len(), 2);
    assert!(last.contents.len() > 4);
    assert_eq!(dispatcher.stats().total_executions, 2);
}

#[tokio::test]
async fn test_lights_switch_in_one_turn() {
    let model = Arc::new(ScriptedModel::new(vec![
        Ok(ScriptedModel::call_turn(vec![
            FunctionCall::new("turn_on_light", json!({})),
            FunctionCall::new("turn_off_light", json!({})),
        ])),
        Ok(Content::model("Flicked it on and off.")),
    ]));
    let mut dispatcher = ToolDispatcher::new(model.clone(), light_tools());
    let mut light = LightContext::default();

    let report = dispatcher.send(&mut light, "blink the light").await.unwrap();
    assert_eq!(report.invocations.len(), 2);
    assert_eq!(report.tool_rounds, 1);
    assert_eq!(light.status, LightStatus::Off);

    // both results go back in a single user turn
    let second_request = &model.requests()[1];
    let responses = second_request.contents.last().unwrap();
    assert_eq!(responses.role, Role::User);
    assert_eq!(responses.parts.len(), 2);
}

#[tokio::test]
async fn test_traffic_tools_mutate_the_store() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ontology.yaml");
    let store = OntologyStore::new(&path);
    store
        .add_vehicle(NewVehicle::new("ABC123", "car").with_owner("Amy"))
        .unwrap();

    let model = Arc::new(ScriptedModel::new(vec![
        Ok(call("update_license", json!({"plate": "ABC123", "license_status": "expired"}))),
        Ok(call("query_ontology", json!({"plate": "ABC123"}))),
        Ok(Content::model("ABC123 is now expired.")),
        Ok(call("add_vehicle", json!({"plate": "ABC123", "type": "car"}))),
        Ok(Content::model("That plate already exists.")),
    ]));
    let mut dispatcher = ToolDispatcher::new(model, ontology_tools());
    let mut context = OntologyContext::new(OntologyStore::new(&path));

    let report = dispatcher
        .send(&mut context, "ABC123's license just expired")
        .await
        .unwrap();
    assert_eq!(report.tool_rounds, 2);
    assert!(report.invocations.iter().all(|i| i.result.success));
    let facts = &report.invocations[1].result.output["facts"];
    assert!(facts.to_string().contains("expired"));
    assert_eq!(store.check_violation("ABC123").unwrap(), ViolationCheck::Violation);

    // duplicate registration is reported to the model, not raised
    let report = dispatcher.send(&mut context, "register ABC123 again").await.unwrap();
    assert!(!report.invocations[0].result.success);
    assert_eq!(report.invocations[0].result.output["status"], "error");
    assert_eq!(report.reply, "That plate already exists.");
    assert_eq!(store.load().unwrap().vehicles.len(), 1);
    assert_eq!(
        store.load().unwrap().vehicles["ABC123"].license_status,
        LicenseStatus::Expired
    );
}

#[tokio::test]
async fn test_unknown_tool_is_reported_back() {
    let model = Arc::new(ScriptedModel::new(vec![
        Ok(call("open_garage", json!({}))),
        Ok(Content::model("I can't do that.")),
    ]));
    let mut dispatcher = ToolDispatcher::new(model, light_tools());
    let mut light = LightContext::default();

    let report = dispatcher.send(&mut light, "open the garage").await.unwrap();
    assert!(!report.invocations[0].result.success);
    assert!(report.invocations[0].result.output["message"]
        .as_str()
        .unwrap()
        .contains("unknown function"));
    assert_eq!(light.status, LightStatus::Off);
}
