use osmachine_cloud::fake::{CountingRecorder, FakeCloud};
use osmachine_cloud::{
    AddressPair, BlockDeviceSource, CloudClients, COMPUTE_SERVICE, Metered, NETWORK_SERVICE,
    NetworkAttachment, PROVIDER_LABEL, Port, Server, ServerStatus, VolumeStatus,
};
use osmachine_config::{DriverSettings, MachineProviderConfig, NetworkConfig};
use osmachine_driver::{DriverError, ErrorCode, Executor, ProviderId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const CLUSTER_TAG: &str = "kubernetes.io-cluster-shoot--dev";
const ROLE_TAG: &str = "kubernetes.io-role-node";

fn tags() -> HashMap<String, String> {
    HashMap::from([
        (CLUSTER_TAG.to_string(), "1".to_string()),
        (ROLE_TAG.to_string(), "1".to_string()),
    ])
}

fn config() -> MachineProviderConfig {
    MachineProviderConfig {
        image_name: Some("ubuntu-22.04".to_string()),
        region: "eu-de-1".to_string(),
        availability_zone: "eu-de-1a".to_string(),
        flavor_name: "m1.large".to_string(),
        security_groups: vec!["nodes".to_string()],
        tags: tags(),
        network_id: Some("net-1".to_string()),
        ..Default::default()
    }
}

fn cloud() -> FakeCloud {
    let cloud = FakeCloud::new();
    cloud.add_image("ubuntu-22.04", "img-1");
    cloud.add_flavor("m1.large", "flavor-1");
    cloud.add_network("private", "net-1");
    cloud.add_network("storage", "net-2");
    cloud.add_security_group("nodes", "sg-1");
    cloud.add_subnet("sub-1", "net-1");
    cloud.add_subnet("sub-2", "net-1");
    cloud
}

fn executor(cloud: &FakeCloud, config: MachineProviderConfig) -> Executor {
    Executor::new(cloud.clients(), config, DriverSettings::default())
}

fn tagged_server(id: &str, name: &str) -> Server {
    Server {
        id: id.to_string(),
        name: name.to_string(),
        status: ServerStatus::Active,
        metadata: tags(),
        fault: None,
    }
}

fn position(calls: &[String], prefix: &str) -> usize {
    calls
        .iter()
        .position(|c| c.starts_with(prefix))
        .unwrap_or_else(|| panic!("no call starting with {prefix:?} in {calls:?}"))
}

#[tokio::test(start_paused = true)]
async fn test_create_is_idempotent() {
    let cloud = cloud();
    let ex = executor(&cloud, config());

    let first = ex.create_machine("worker-0", b"#cloud-config").await.unwrap();
    let second = ex.create_machine("worker-0", b"#cloud-config").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(cloud.servers().len(), 1);
    assert_eq!(cloud.call_count("create_server"), 1);

    let provider_id: ProviderId = first.parse().unwrap();
    assert_eq!(provider_id.region, "eu-de-1");
    assert_eq!(provider_id.server_id, cloud.servers()[0].id);
}

#[tokio::test(start_paused = true)]
async fn test_create_sends_configured_parameters() {
    let cloud = cloud();
    let mut config = config();
    config.key_name = Some("ops".to_string());
    config.server_group_id = Some("group-1".to_string());
    config.use_config_drive = Some(true);
    let ex = executor(&cloud, config);

    ex.create_machine("worker-0", b"#cloud-config").await.unwrap();

    let requests = cloud.create_requests();
    let request = &requests[0];
    assert_eq!(request.name, "worker-0");
    assert_eq!(request.image_ref, "img-1");
    assert_eq!(request.flavor_ref, "flavor-1");
    assert_eq!(request.security_groups, vec!["nodes"]);
    assert_eq!(request.metadata, tags());
    assert_eq!(request.user_data, b"#cloud-config");
    assert_eq!(request.availability_zone.as_deref(), Some("eu-de-1a"));
    assert_eq!(request.key_name.as_deref(), Some("ops"));
    assert_eq!(request.server_group.as_deref(), Some("group-1"));
    assert_eq!(request.config_drive, Some(true));
    assert!(request.block_devices.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_image_id_wins_over_name() {
    let cloud = cloud();
    let mut config = config();
    config.image_id = Some("img-explicit".to_string());
    let ex = executor(&cloud, config);

    ex.create_machine("worker-0", b"").await.unwrap();

    assert_eq!(cloud.create_requests()[0].image_ref, "img-explicit");
    assert_eq!(cloud.call_count("image_id_from_name"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_create_ignores_servers_with_similar_names() {
    let cloud = cloud();
    cloud.insert_server(tagged_server("other", "worker-10"));
    let ex = executor(&cloud, config());

    ex.create_machine("worker-1", b"").await.unwrap();

    assert_eq!(cloud.servers().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_delete_is_idempotent() {
    let cloud = cloud();
    let ex = executor(&cloud, config());
    ex.create_machine("worker-0", b"").await.unwrap();

    ex.delete_machine("worker-0", None).await.unwrap();
    ex.delete_machine("worker-0", None).await.unwrap();

    assert!(cloud.servers().is_empty());
    assert_eq!(cloud.call_count("delete_server"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_delete_by_provider_id() {
    let cloud = cloud();
    let ex = executor(&cloud, config());
    let provider_id = ex.create_machine("worker-0", b"").await.unwrap();

    ex.delete_machine("ignored", Some(&provider_id)).await.unwrap();

    assert!(cloud.servers().is_empty());
    assert_eq!(cloud.call_count("list_servers"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_delete_by_provider_id_requires_matching_tags() {
    let cloud = cloud();
    cloud.insert_server(Server {
        metadata: HashMap::new(),
        ..tagged_server("foreign", "worker-0")
    });
    let ex = executor(&cloud, config());

    let provider_id = ProviderId::new("eu-de-1", "foreign").to_string();
    ex.delete_machine("worker-0", Some(&provider_id)).await.unwrap();

    assert_eq!(cloud.servers().len(), 1);
    assert_eq!(cloud.call_count("delete_server"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_delete_rejects_malformed_provider_id() {
    let cloud = cloud();
    let ex = executor(&cloud, config());

    let err = ex
        .delete_machine("worker-0", Some("aws:///eu/i-123"))
        .await
        .unwrap_err();
    assert!(matches!(err, DriverError::InvalidProviderId(_)));
}

#[tokio::test(start_paused = true)]
async fn test_direct_network_attaches_bare_network() {
    let cloud = cloud();
    let ex = executor(&cloud, config());

    ex.create_machine("worker-0", b"").await.unwrap();

    assert_eq!(
        cloud.create_requests()[0].networks,
        vec![NetworkAttachment::Network {
            id: "net-1".to_string()
        }]
    );
    assert_eq!(cloud.call_count("port_id_from_name"), 0);
    assert_eq!(cloud.call_count("create_port"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_managed_port_lifecycle() {
    let cloud = cloud();
    let mut config = config();
    config.subnet_ids = vec!["sub-2".to_string()];
    config.subnet_id = Some("sub-1".to_string());
    config.pod_network_cidr = "100.96.0.0/11".to_string();
    let ex = executor(&cloud, config);

    ex.create_machine("worker-0", b"").await.unwrap();

    assert_eq!(cloud.call_count("get_subnet"), 2);
    assert_eq!(cloud.call_count("create_port"), 1);
    let ports = cloud.ports();
    assert_eq!(ports.len(), 1);
    let port = &ports[0];
    assert_eq!(port.name, "worker-0");
    assert_eq!(port.network_id, "net-1");
    let subnets: Vec<_> = port.fixed_ips.iter().map(|ip| ip.subnet_id.as_str()).collect();
    assert_eq!(subnets, vec!["sub-1", "sub-2"]);
    assert_eq!(
        port.allowed_address_pairs,
        vec![AddressPair::new("100.96.0.0/11")]
    );
    assert!(cloud.calls().contains(&"security_group_id_from_name:nodes".to_string()));
    assert_eq!(
        cloud.create_requests()[0].networks,
        vec![NetworkAttachment::Port {
            network_id: "net-1".to_string(),
            port_id: port.id.clone(),
        }]
    );
    // pre-seeded pairs already cover the pod network
    assert_eq!(cloud.call_count("update_port"), 0);

    ex.delete_machine("worker-0", None).await.unwrap();
    assert!(cloud.ports().is_empty());
    ex.delete_machine("worker-0", None).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_managed_port_is_reused_on_retry() {
    let cloud = cloud();
    cloud.insert_port(Port {
        id: "port-existing".to_string(),
        name: "worker-0".to_string(),
        network_id: "net-1".to_string(),
        ..Default::default()
    });
    let mut config = config();
    config.subnet_ids = vec!["sub-1".to_string()];
    let ex = executor(&cloud, config);

    ex.create_machine("worker-0", b"").await.unwrap();

    assert_eq!(cloud.call_count("create_port"), 0);
    assert_eq!(
        cloud.create_requests()[0].networks,
        vec![NetworkAttachment::Port {
            network_id: "net-1".to_string(),
            port_id: "port-existing".to_string(),
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_missing_subnet_fails_before_provisioning() {
    let cloud = cloud();
    let mut config = config();
    config.subnet_ids = vec!["sub-missing".to_string()];
    let ex = executor(&cloud, config);

    let err = ex.create_machine("worker-0", b"").await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::NotFound);
    assert_eq!(cloud.call_count("create_port"), 0);
    assert_eq!(cloud.call_count("create_server"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_named_networks_resolved_in_order() {
    let cloud = cloud();
    let mut config = config();
    config.network_id = None;
    config.networks = vec![
        NetworkConfig {
            name: Some("storage".to_string()),
            ..Default::default()
        },
        NetworkConfig {
            id: Some("net-9".to_string()),
            name: Some("ignored".to_string()),
            pod_network: true,
        },
    ];
    let ex = executor(&cloud, config);

    ex.create_machine("worker-0", b"").await.unwrap();

    assert_eq!(
        cloud.create_requests()[0].networks,
        vec![
            NetworkAttachment::Network {
                id: "net-2".to_string()
            },
            NetworkAttachment::Network {
                id: "net-9".to_string()
            },
        ]
    );
    assert_eq!(cloud.call_count("network_id_from_name"), 1);
    assert_eq!(cloud.call_count("create_port"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_boot_volume_lifecycle() {
    let cloud = cloud();
    let mut config = config();
    config.root_disk_size = 50;
    config.volume_type = Some("ssd".to_string());
    let ex = executor(&cloud, config);

    ex.create_machine("worker-0", b"").await.unwrap();

    let volumes = cloud.volumes();
    assert_eq!(volumes.len(), 1);
    let volume = &volumes[0];
    assert_eq!(volume.name, "worker-0");
    assert_eq!(volume.size, 50);
    assert_eq!(volume.volume_type.as_deref(), Some("ssd"));
    assert_eq!(volume.status, VolumeStatus::InUse);

    let requests = cloud.create_requests();
    let request = &requests[0];
    assert_eq!(request.block_devices.len(), 1);
    let device = &request.block_devices[0];
    assert_eq!(device.source, BlockDeviceSource::Volume);
    assert_eq!(device.uuid, volume.id);
    assert!(device.delete_on_termination);

    let calls = cloud.calls();
    assert!(position(&calls, "create_volume:") < position(&calls, "get_volume:"));
    assert!(position(&calls, "get_volume:") < position(&calls, "boot_from_volume:"));
    assert_eq!(cloud.call_count("create_server"), 0);

    ex.delete_machine("worker-0", None).await.unwrap();
    assert!(cloud.volumes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_boot_volume_waits_while_downloading() {
    let cloud = cloud();
    cloud.script_volume_statuses([
        VolumeStatus::Creating,
        VolumeStatus::Downloading,
        VolumeStatus::Available,
    ]);
    let mut config = config();
    config.root_disk_size = 20;
    config.volume_type = Some("ssd".to_string());
    let ex = executor(&cloud, config);

    ex.create_machine("worker-0", b"").await.unwrap();

    assert_eq!(cloud.call_count("get_volume"), 3);
    assert_eq!(cloud.call_count("boot_from_volume"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_existing_boot_volume_is_reused() {
    let cloud = cloud();
    cloud.insert_volume(osmachine_cloud::Volume {
        id: "vol-existing".to_string(),
        name: "worker-0".to_string(),
        status: VolumeStatus::Available,
        size: 50,
        volume_type: Some("ssd".to_string()),
    });
    let mut config = config();
    config.root_disk_size = 50;
    config.volume_type = Some("ssd".to_string());
    let ex = executor(&cloud, config);

    ex.create_machine("worker-0", b"").await.unwrap();

    assert_eq!(cloud.call_count("create_volume"), 0);
    assert_eq!(cloud.create_requests()[0].block_devices[0].uuid, "vol-existing");
}

#[tokio::test(start_paused = true)]
async fn test_boot_volume_deleted_when_server_creation_fails() {
    let cloud = cloud();
    cloud.fail_on("boot_from_volume");
    let mut config = config();
    config.root_disk_size = 50;
    config.volume_type = Some("ssd".to_string());
    let ex = executor(&cloud, config);

    let err = ex.create_machine("worker-0", b"").await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::Internal);
    assert!(err.to_string().contains("injected failure in boot_from_volume"));
    assert!(cloud.volumes().is_empty());
    assert_eq!(cloud.call_count("delete_volume"), 1);
    let calls = cloud.calls();
    assert!(position(&calls, "boot_from_volume:") < position(&calls, "delete_volume:"));
}

#[tokio::test(start_paused = true)]
async fn test_volume_cleanup_failure_is_chained() {
    let cloud = cloud();
    cloud.fail_on("boot_from_volume");
    cloud.fail_on("delete_volume");
    let mut config = config();
    config.root_disk_size = 50;
    config.volume_type = Some("ssd".to_string());
    let ex = executor(&cloud, config);

    let err = ex.create_machine("worker-0", b"").await.unwrap_err();

    let message = err.to_string();
    assert!(message.contains("injected failure in boot_from_volume"));
    assert!(message.contains("injected failure in delete_volume"));
    assert!(matches!(err, DriverError::Rollback { .. }));
    assert_eq!(cloud.volumes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_inline_root_volume() {
    let cloud = cloud();
    let mut config = config();
    config.root_disk_size = 30;
    let ex = executor(&cloud, config);

    ex.create_machine("worker-0", b"").await.unwrap();

    let requests = cloud.create_requests();
    let device = &requests[0].block_devices[0];
    assert_eq!(device.source, BlockDeviceSource::Image);
    assert_eq!(device.uuid, "img-1");
    assert_eq!(device.volume_size, Some(30));
    assert!(device.delete_on_termination);
    assert_eq!(cloud.call_count("create_volume"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_server_error_surfaces_fault_and_rolls_back() {
    let cloud = cloud();
    cloud.script_server_statuses([ServerStatus::Build, ServerStatus::Error]);
    let ex = executor(&cloud, config());

    let err = ex.create_machine("worker-0", b"").await.unwrap_err();

    assert!(err.to_string().contains("No valid host was found"));
    assert_eq!(err.code(), ErrorCode::Internal);
    assert!(cloud.servers().is_empty());
    assert!(cloud.ports().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_server_build_timeout_rolls_back() {
    let cloud = cloud();
    cloud.script_server_statuses(std::iter::repeat_n(ServerStatus::Build, 200));
    let settings = DriverSettings {
        server_create_timeout_secs: 30,
        ..Default::default()
    };
    let ex = Executor::new(cloud.clients(), config(), settings);

    let err = ex.create_machine("worker-0", b"").await.unwrap_err();

    assert!(err.to_string().contains("did not reach target status"));
    // polls at 0, 5, ..., 25s
    assert!(cloud.call_count("get_server") >= 6);
    assert!(cloud.servers().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_aborts_wait() {
    let cloud = cloud();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let ex = executor(&cloud, config()).with_cancellation(cancel);

    let err = ex.create_machine("worker-0", b"").await.unwrap_err();

    assert!(err.to_string().contains("cancelled"));
    assert_eq!(cloud.call_count("get_server"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_ambiguous_name_is_an_error() {
    let cloud = cloud();
    cloud.insert_server(tagged_server("s-a", "worker-0"));
    cloud.insert_server(tagged_server("s-b", "worker-0"));
    let ex = executor(&cloud, config());

    let err = ex.find_server_by_name("worker-0").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::MultipleFound);

    let err = ex.create_machine("worker-0", b"").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::MultipleFound);
    assert_eq!(cloud.call_count("create_server"), 0);
    assert_eq!(cloud.servers().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_pod_network_patch_is_idempotent() {
    let cloud = cloud();
    let mut config = config();
    config.pod_network_cidr = "100.96.0.0/11,fd00:10::/48".to_string();
    let ex = executor(&cloud, config);

    ex.create_machine("worker-0", b"").await.unwrap();
    assert_eq!(cloud.call_count("update_port"), 1);
    assert_eq!(
        cloud.ports()[0].allowed_address_pairs,
        vec![
            AddressPair::new("100.96.0.0/11"),
            AddressPair::new("fd00:10::/48")
        ]
    );

    // the retry finds every CIDR already allowed
    ex.create_machine("worker-0", b"").await.unwrap();
    assert_eq!(cloud.call_count("update_port"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_pod_network_patch_replaces_partial_allow_list() {
    let cloud = cloud();
    let server = tagged_server("s-1", "worker-0");
    cloud.insert_server(server);
    cloud.insert_port(Port {
        id: "port-1".to_string(),
        network_id: "net-1".to_string(),
        device_id: "s-1".to_string(),
        allowed_address_pairs: vec![
            AddressPair::new("100.96.0.0/11"),
            AddressPair::new("10.0.0.0/8"),
        ],
        ..Default::default()
    });
    cloud.insert_port(Port {
        id: "port-2".to_string(),
        network_id: "net-2".to_string(),
        device_id: "s-1".to_string(),
        ..Default::default()
    });
    let mut config = config();
    config.pod_network_cidr = "100.96.0.0/11,100.64.0.0/13".to_string();
    let ex = executor(&cloud, config);

    ex.create_machine("worker-0", b"").await.unwrap();

    assert_eq!(cloud.calls().iter().filter(|c| *c == "update_port:port-1").count(), 1);
    assert_eq!(cloud.call_count("update_port"), 1);
    let port = cloud.ports().into_iter().find(|p| p.id == "port-1").unwrap();
    assert_eq!(
        port.allowed_address_pairs,
        vec![
            AddressPair::new("100.96.0.0/11"),
            AddressPair::new("100.64.0.0/13")
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_empty_port_list_fails_create() {
    let cloud = cloud();
    cloud.insert_server(tagged_server("s-1", "worker-0"));
    let ex = executor(&cloud, config());

    let err = ex.create_machine("worker-0", b"").await.unwrap_err();

    assert!(err.to_string().contains("empty port list"));
    // the adopted server is rolled back like a new one
    assert!(cloud.servers().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_list_requires_cluster_and_role_tags() {
    let cloud = cloud();
    let mut config = config();
    config.tags = HashMap::from([(CLUSTER_TAG.to_string(), "1".to_string())]);
    let ex = executor(&cloud, config);

    let err = ex.list_machines().await.unwrap_err();
    assert!(matches!(err, DriverError::MissingClusterTags(_)));
    assert_eq!(cloud.call_count("list_servers"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_create_requires_cluster_and_role_tags() {
    let cloud = cloud();
    let mut config = config();
    config.tags = HashMap::from([(ROLE_TAG.to_string(), "1".to_string())]);
    let ex = executor(&cloud, config);

    let err = ex.create_machine("worker-0", b"").await.unwrap_err();

    assert!(matches!(err, DriverError::MissingClusterTags(_)));
    assert!(cloud.calls().is_empty());
    assert!(cloud.servers().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_delete_by_name_requires_cluster_and_role_tags() {
    let cloud = cloud();
    cloud.insert_server(tagged_server("s-1", "worker-0"));
    let mut config = config();
    config.tags = HashMap::from([(CLUSTER_TAG.to_string(), "1".to_string())]);
    let ex = executor(&cloud, config);

    let err = ex.delete_machine("worker-0", None).await.unwrap_err();

    assert!(matches!(err, DriverError::MissingClusterTags(_)));
    assert_eq!(cloud.servers().len(), 1);
    assert_eq!(cloud.call_count("delete_server"), 0);
}

/// Without both tag keys a fetched server cannot be proven ours, so the
/// delete fails instead of treating the server as absent
#[tokio::test(start_paused = true)]
async fn test_delete_by_provider_id_requires_cluster_and_role_tags() {
    let cloud = cloud();
    cloud.insert_server(tagged_server("s-1", "worker-0"));
    let mut config = config();
    config.tags = HashMap::from([(CLUSTER_TAG.to_string(), "1".to_string())]);
    let ex = executor(&cloud, config);

    let provider_id = ProviderId::new("eu-de-1", "s-1").to_string();
    let err = ex
        .delete_machine("worker-0", Some(&provider_id))
        .await
        .unwrap_err();

    assert!(matches!(err, DriverError::MissingClusterTags(_)));
    assert_eq!(err.code(), ErrorCode::Internal);
    assert_eq!(cloud.call_count("get_server"), 0);
    assert_eq!(cloud.servers().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_list_filters_by_tags() {
    let cloud = cloud();
    cloud.insert_server(tagged_server("s-1", "worker-0"));
    cloud.insert_server(tagged_server("s-2", "worker-1"));
    cloud.insert_server(Server {
        metadata: HashMap::from([(CLUSTER_TAG.to_string(), "1".to_string())]),
        ..tagged_server("s-3", "bastion")
    });
    let ex = executor(&cloud, config());

    let machines = ex.list_machines().await.unwrap();

    assert_eq!(machines.len(), 2);
    assert_eq!(machines["openstack:///eu-de-1/s-1"], "worker-0");
    assert_eq!(machines["openstack:///eu-de-1/s-2"], "worker-1");
}

#[tokio::test(start_paused = true)]
async fn test_every_call_is_recorded() {
    let cloud = cloud();
    let recorder = Arc::new(CountingRecorder::default());
    let clients = CloudClients {
        compute: Arc::new(Metered::new(cloud.clone(), COMPUTE_SERVICE, recorder.clone())),
        network: Arc::new(Metered::new(cloud.clone(), NETWORK_SERVICE, recorder.clone())),
        storage: Arc::new(Metered::new(
            cloud.clone(),
            osmachine_cloud::STORAGE_SERVICE,
            recorder.clone(),
        )),
    };
    let ex = Executor::new(clients, config(), DriverSettings::default());

    ex.create_machine("worker-0", b"").await.unwrap();
    ex.delete_machine("worker-0", None).await.unwrap();

    let compute_calls: u64 = [
        "list_servers",
        "image_id_from_name",
        "flavor_id_from_name",
        "create_server",
        "get_server",
        "delete_server",
    ]
    .into_iter()
    .map(|op| cloud.call_count(op) as u64)
    .sum();
    assert_eq!(recorder.requests(PROVIDER_LABEL, COMPUTE_SERVICE), compute_calls);
    assert_eq!(
        recorder.requests(PROVIDER_LABEL, NETWORK_SERVICE),
        cloud.call_count("list_ports") as u64
    );
    // the final not-found poll of the deletion is not a failure
    assert_eq!(recorder.failures(PROVIDER_LABEL, COMPUTE_SERVICE), 0);
}
