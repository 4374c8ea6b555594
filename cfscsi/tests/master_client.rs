//! The HTTP master client against an in-process fake master.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{StatusCode, Uri};
use serde_json::json;

use cfscsi::CsiError;
use cfscsi::cluster::http::MasterClient;
use cfscsi::cluster::{AdminOutcome, LeaderQuery, VolumeAdmin};
use cfscsi::provision::VolumeProvisioner;

type Request = (String, HashMap<String, String>);

#[derive(Default)]
struct Master {
    leader: Mutex<String>,
    /// Answer with `{"code", "msg", "data"}` envelopes.
    enveloped: bool,
    hang: bool,
    reject_partitions: bool,
    /// Serve `/vol/delete` as an unknown route, like a misrouted host.
    no_delete_route: bool,
    volumes: Mutex<HashSet<String>>,
    log: Mutex<Vec<Request>>,
}

impl Master {
    fn requests(&self) -> Vec<Request> {
        self.log.lock().unwrap().clone()
    }
}

async fn handle(
    State(master): State<Arc<Master>>,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    if master.hang {
        tokio::time::sleep(Duration::from_secs(5)).await;
    }
    master
        .log
        .lock()
        .unwrap()
        .push((uri.path().to_owned(), query.clone()));

    let name = query.get("name").cloned().unwrap_or_default();
    match uri.path() {
        "/admin/getCluster" => {
            let leader = master.leader.lock().unwrap().clone();
            let body = if master.enveloped {
                json!({"code": 0, "msg": "success", "data": {"LeaderAddr": leader}})
            } else {
                json!({"Name": "cfs-test", "LeaderAddr": leader})
            };
            (StatusCode::OK, body.to_string())
        }
        "/admin/createVol" => {
            if master.volumes.lock().unwrap().insert(name.clone()) {
                (StatusCode::OK, format!("create vol[{name}] successfully"))
            } else {
                (
                    StatusCode::OK,
                    json!({"code": 1, "msg": "duplicate vol"}).to_string(),
                )
            }
        }
        "/dataPartition/create" if master.reject_partitions => (
            StatusCode::OK,
            json!({"code": 2, "msg": "no enough data nodes"}).to_string(),
        ),
        "/dataPartition/create" => (
            StatusCode::OK,
            json!({"code": 0, "msg": "success"}).to_string(),
        ),
        "/vol/delete" if master.no_delete_route => {
            (StatusCode::NOT_FOUND, "404 page not found".to_owned())
        }
        "/vol/delete" => {
            if master.volumes.lock().unwrap().remove(&name) {
                (StatusCode::OK, format!("delete vol[{name}] successfully"))
            } else if master.enveloped {
                (
                    StatusCode::OK,
                    json!({"code": 7, "msg": "vol not exists"}).to_string(),
                )
            } else {
                (StatusCode::NOT_FOUND, "vol not exists".to_owned())
            }
        }
        _ => (StatusCode::NOT_FOUND, "404 page not found".to_owned()),
    }
}

/// Start `master` on a free local port.  It reports itself as the leader.
async fn serve(master: Master) -> (Arc<Master>, SocketAddr) {
    let master = Arc::new(master);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    *master.leader.lock().unwrap() = addr.to_string();

    let app = Router::new().fallback(handle).with_state(Arc::clone(&master));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (master, addr)
}

fn client() -> MasterClient {
    MasterClient::new(Duration::from_secs(2)).unwrap()
}

fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

#[tokio::test]
async fn leader_is_read_from_both_reply_forms() {
    let (_, bare) = serve(Master::default()).await;
    let (_, enveloped) = serve(Master {
        enveloped: true,
        ..Default::default()
    })
    .await;

    let client = client();
    assert_eq!(
        client.leader_of(&bare.to_string()).await.unwrap(),
        bare.to_string()
    );
    assert_eq!(
        client.leader_of(&enveloped.to_string()).await.unwrap(),
        enveloped.to_string()
    );
}

#[tokio::test]
async fn create_volume_sends_expected_requests() {
    let (master, addr) = serve(Master::default()).await;
    let provisioner = VolumeProvisioner::new(client());

    let spec = provisioner
        .create("pvc-1", 0, &[addr.to_string()])
        .await
        .unwrap();

    assert_eq!(spec.partition_count, 1);
    assert_eq!(
        master.requests(),
        vec![
            ("/admin/getCluster".to_owned(), HashMap::new()),
            (
                "/admin/createVol".to_owned(),
                query(&[("name", "pvc-1"), ("replicas", "3"), ("type", "extent")])
            ),
            (
                "/dataPartition/create".to_owned(),
                query(&[("count", "1"), ("name", "pvc-1"), ("type", "extent")])
            ),
        ]
    );
}

#[tokio::test]
async fn rejected_partitions_roll_back_the_volume() {
    let (master, addr) = serve(Master {
        reject_partitions: true,
        ..Default::default()
    })
    .await;
    let provisioner = VolumeProvisioner::new(client());

    let err = provisioner
        .create("pvc-2", 300 * 1024 * 1024 * 1024, &[addr.to_string()])
        .await
        .unwrap_err();

    assert!(matches!(err, CsiError::Internal(_)));
    assert!(master.volumes.lock().unwrap().is_empty());
    let paths: Vec<_> = master.requests().into_iter().map(|(p, _)| p).collect();
    assert_eq!(
        paths,
        vec![
            "/admin/getCluster",
            "/admin/createVol",
            "/dataPartition/create",
            "/vol/delete"
        ]
    );
}

#[tokio::test]
async fn deleting_absent_volume_succeeds() {
    for enveloped in [false, true] {
        let (master, addr) = serve(Master {
            enveloped,
            ..Default::default()
        })
        .await;
        let client = client();

        assert_eq!(
            client
                .delete_volume(&addr.to_string(), "pvc-gone")
                .await
                .unwrap(),
            AdminOutcome::Absent
        );

        let provisioner = VolumeProvisioner::new(client);
        provisioner
            .delete("pvc-gone", &[addr.to_string()])
            .await
            .unwrap();
        assert_eq!(
            master.requests().last().unwrap(),
            &("/vol/delete".to_owned(), query(&[("name", "pvc-gone")]))
        );
    }
}

#[tokio::test]
async fn unknown_route_is_not_a_deleted_volume() {
    let (master, addr) = serve(Master {
        no_delete_route: true,
        ..Default::default()
    })
    .await;
    master.volumes.lock().unwrap().insert("pvc-4".into());

    let err = VolumeProvisioner::new(client())
        .delete("pvc-4", &[addr.to_string()])
        .await
        .unwrap_err();

    assert!(matches!(err, CsiError::Unavailable(_)));
    assert!(master.volumes.lock().unwrap().contains("pvc-4"));
}

#[tokio::test]
async fn duplicate_create_is_reported() {
    let (master, addr) = serve(Master::default()).await;
    master.volumes.lock().unwrap().insert("pvc-3".into());

    let outcome = client()
        .create_volume(&addr.to_string(), "pvc-3")
        .await
        .unwrap();
    assert_eq!(outcome, AdminOutcome::AlreadyExists);

    let err = VolumeProvisioner::new(client())
        .create("pvc-3", 0, &[addr.to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, CsiError::AlreadyExists(_)));
    assert!(
        !master
            .requests()
            .iter()
            .any(|(path, _)| path == "/dataPartition/create")
    );
}

#[tokio::test]
async fn unreachable_master_is_unavailable() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let err = client().leader_of(&addr.to_string()).await.unwrap_err();
    assert!(matches!(err, CsiError::Unavailable(_)));
}

#[tokio::test]
async fn hung_master_times_out() {
    let (_, addr) = serve(Master {
        hang: true,
        ..Default::default()
    })
    .await;

    let client = MasterClient::new(Duration::from_millis(200)).unwrap();
    let err = client.leader_of(&addr.to_string()).await.unwrap_err();
    assert!(matches!(err, CsiError::Unavailable(_)));
}
