//! `HttpLeadsApi` and `Workspace` against a stub backend over real HTTP.

mod common;

use common::{StubBackend, lead_json};
use leadsflow::api::{ApiErrorKind, HttpLeadsApi, LeadsApi};
use leadsflow::store::Store;
use leadsflow::{Workspace, WorkspaceOptions};
use leadsflow_common::{LeadPatch, NewLead};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn client(url: &str, token: Option<&str>) -> HttpLeadsApi {
    HttpLeadsApi::new(url, token.map(str::to_string), Duration::from_secs(5)).unwrap()
}

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

mod decoding {
    use super::*;

    #[tokio::test]
    async fn test_list_accepts_legacy_fields_and_drops_bad_records() {
        let backend = StubBackend::spawn(vec![
            lead_json("a", "Ana", "novo"),
            json!({ "id": 7, "nome": "Bia", "telefone": "11999990000", "created_at": "2026-01-10T12:00:00Z" }),
            json!({ "id": "broken" }),
        ]);
        let leads = client(&backend.url, None).list_leads().await.unwrap();

        assert_eq!(leads.len(), 2);
        assert_eq!(leads[1].id, "7");
        assert_eq!(leads[1].name, "Bia");
        assert_eq!(leads[1].phone.as_deref(), Some("11999990000"));
        assert_eq!(leads[1].status, "");
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let backend = StubBackend::spawn(vec![]);
        backend.state().token = Some("s3cret".into());

        let err = client(&backend.url, None).list_leads().await.unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Unauthorized);
        assert_eq!(err.status(), Some(401));

        let ok = client(&backend.url, Some("s3cret")).list_leads().await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn test_delete_errors_are_classified() {
        let backend = StubBackend::spawn(vec![lead_json("a", "Ana", "novo")]);
        backend.state().locked.insert("a".into());
        let api = client(&backend.url, None);

        let locked = api.delete_lead("a").await.unwrap_err();
        assert_eq!(locked.kind(), ApiErrorKind::Rejected);

        let missing = api.delete_lead("zzz").await.unwrap_err();
        assert!(missing.is_gone());
    }

    #[tokio::test]
    async fn test_create_and_update_round_trip() {
        let backend = StubBackend::spawn(vec![]);
        let api = client(&backend.url, None);

        let created = api.create_lead(&NewLead::named("Caio")).await.unwrap();
        assert_eq!(created.id, "srv-1");

        let updated = api
            .update_lead(&created.id, &LeadPatch::status("proposta"))
            .await
            .unwrap();
        assert_eq!(updated.status, "proposta");
        assert_eq!(api.get_lead("srv-1").await.unwrap().status, "proposta");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_unavailable() {
        let url = {
            let backend = StubBackend::spawn(vec![]);
            backend.url.clone()
        };
        // Give the stub a moment to release the port.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let err = client(&url, None).list_leads().await.unwrap_err();
        assert!(err.is_connectivity());
    }
}

mod workspace_over_http {
    use super::*;

    fn workspace(url: &str, home: &std::path::Path) -> Workspace {
        Workspace::new(
            Arc::new(client(url, None)),
            Store::open(home).unwrap(),
            WorkspaceOptions {
                user: "ana".into(),
                ..WorkspaceOptions::default()
            },
        )
    }

    #[tokio::test]
    async fn test_bulk_delete_persists_confirmed_ids() {
        let backend = StubBackend::spawn(vec![
            lead_json("a", "Ana", "novo"),
            lead_json("b", "Bia", "novo"),
            lead_json("c", "Caio", "novo"),
            lead_json("d", "Davi", "proposta"),
        ]);
        backend.state().locked.insert("c".into());
        let home = tempfile::tempdir().unwrap();
        let ws = workspace(&backend.url, home.path());
        ws.refresh().await.unwrap();

        let outcome = ws
            .delete_leads(&ids(&["a", "ghost", "c", "b"]), |_, _| {})
            .await;
        let report = &outcome.report;
        assert_eq!(report.deleted, ids(&["a", "ghost", "b"]));
        assert_eq!(report.already_absent, 1);
        assert_eq!(report.errors, 1);
        assert_eq!(report.failures[0].id, "c");
        assert!(!report.aborted);

        let cached: Vec<String> = ws.leads().into_iter().map(|l| l.id).collect();
        assert_eq!(cached, ids(&["c", "d"]));
        assert_eq!(backend.lead_ids(), ids(&["c", "d"]));

        // Reconcile prunes tracked ids the backend no longer lists.
        outcome.reconcile.unwrap().await.unwrap().unwrap();
        let reopened = Store::open(home.path()).unwrap();
        assert!(reopened.data().deleted_for("ana").is_empty());
    }

    #[tokio::test]
    async fn test_drop_on_won_stage_updates_backend() {
        let backend = StubBackend::spawn(vec![lead_json("a", "Ana", "novo")]);
        let home = tempfile::tempdir().unwrap();
        let ws = workspace(&backend.url, home.path());
        ws.refresh().await.unwrap();

        let lead = ws.move_lead_to_stage("a", "convertido").await.unwrap();
        assert_eq!(lead.status, "convertido");
        assert!(lead.converted_at.is_some());
        assert_eq!(backend.state().leads[0]["status"], "convertido");
    }

    #[tokio::test]
    async fn test_stage_changes_survive_reopen() {
        let backend = StubBackend::spawn(vec![]);
        let home = tempfile::tempdir().unwrap();
        {
            let ws = workspace(&backend.url, home.path());
            ws.add_stage("Demo", "#123456").unwrap();
            ws.set_preference("theme", "dark").unwrap();
        }
        let ws = workspace(&backend.url, home.path());
        assert_eq!(ws.stages().last().unwrap().label, "Demo");
        assert_eq!(ws.preferences().theme.as_str(), "dark");
    }

    #[tokio::test]
    async fn test_remote_settings_round_trip() {
        let backend = StubBackend::spawn(vec![]);
        let home = tempfile::tempdir().unwrap();
        let ws = workspace(&backend.url, home.path());

        ws.set_remote_setting("company", json!("Acme")).await.unwrap();
        assert_eq!(backend.state().settings["company"], "Acme");
        assert_eq!(ws.remote_settings().await.unwrap()["company"], "Acme");
    }
}
