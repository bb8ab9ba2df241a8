use prism_caps::{caps, layers, ApiVersion};
use prism_icd::{
    ConfigFragment, DeviceConfig, DeviceFeatures, DeviceKind, Driver, InstanceConfig, MockIcd,
    MockPhysicalDevice, QueueRequest, Status, SurfaceDesc,
};

fn basic_instance(icd: &MockIcd) -> prism_icd::InstanceHandle {
    icd.create_instance(&InstanceConfig::new("mock-icd-tests", ApiVersion::V1_3))
        .unwrap()
}

#[test]
fn instance_creation_validates_layers_and_extensions() {
    let icd = MockIcd::conformant();

    let mut config = InstanceConfig::new("t", ApiVersion::V1_3);
    config.layers.push("prism.layer.nonexistent".to_owned());
    assert_eq!(
        icd.create_instance(&config),
        Err(Status::ErrorLayerNotPresent)
    );

    let mut config = InstanceConfig::new("t", ApiVersion::V1_3);
    config.extensions.push("prism.ext.nonexistent".to_owned());
    assert_eq!(
        icd.create_instance(&config),
        Err(Status::ErrorExtensionNotPresent)
    );

    // Debug extensions are layer-provided: visible only with the layer on.
    let mut config = InstanceConfig::new("t", ApiVersion::V1_3);
    config.extensions.push(caps::DEBUG_UTILS.to_owned());
    assert_eq!(
        icd.create_instance(&config),
        Err(Status::ErrorExtensionNotPresent)
    );
    config.layers.push(layers::VALIDATION.to_owned());
    assert!(icd.create_instance(&config).is_ok());
}

#[test]
fn enumeration_counters_count_driver_round_trips() {
    let icd = MockIcd::conformant();
    assert_eq!(icd.counters().layer_enumerations(), 0);
    icd.enumerate_instance_layers().unwrap();
    icd.enumerate_instance_layers().unwrap();
    assert_eq!(icd.counters().layer_enumerations(), 2);

    icd.enumerate_instance_extensions(None).unwrap();
    assert_eq!(icd.counters().instance_extension_enumerations(), 1);
}

#[test]
fn features2_requires_extended_query_visibility() {
    // 1.0 loader, no extended-query extension enabled: base query only.
    let icd = MockIcd::new(ApiVersion::V1_0)
        .with_instance_extension(caps::GET_PHYSICAL_DEVICE_PROPERTIES2, 2)
        .with_physical_device(MockPhysicalDevice::conformant(
            DeviceKind::DiscreteGpu,
            ApiVersion::V1_0,
        ));

    let instance = icd
        .create_instance(&InstanceConfig::new("t", ApiVersion::V1_0))
        .unwrap();
    let physical = icd.enumerate_physical_devices(instance).unwrap()[0];
    assert_eq!(icd.features2(physical), Err(Status::ErrorExtensionNotPresent));
    assert_eq!(
        icd.driver_properties(physical),
        Err(Status::ErrorExtensionNotPresent)
    );

    // Base query clips everything outside the base block.
    let base = icd.features(physical).unwrap();
    assert_eq!(base, DeviceFeatures::all() & DeviceFeatures::BASE);

    // Enabling the extension makes the extended query visible.
    let mut config = InstanceConfig::new("t", ApiVersion::V1_0);
    config
        .extensions
        .push(caps::GET_PHYSICAL_DEVICE_PROPERTIES2.to_owned());
    let instance2 = icd.create_instance(&config).unwrap();
    let physical2 = icd.enumerate_physical_devices(instance2).unwrap()[0];
    assert_eq!(icd.features2(physical2), Ok(DeviceFeatures::all()));
    assert_eq!(
        icd.driver_properties(physical2).unwrap().driver_name,
        "prism-mock"
    );
}

#[test]
fn device_creation_validates_extensions_and_features() {
    let icd = MockIcd::conformant();
    let instance = basic_instance(&icd);
    let physical = icd.enumerate_physical_devices(instance).unwrap()[0];

    let config = DeviceConfig {
        extensions: vec!["prism.ext.nonexistent".to_owned()],
        ..DeviceConfig::default()
    };
    assert_eq!(
        icd.create_device(physical, &config),
        Err(Status::ErrorExtensionNotPresent)
    );

    // A feature bit carried by a core block counts against support too.
    let weak = MockIcd::new(ApiVersion::V1_3).with_physical_device(
        MockPhysicalDevice::conformant(DeviceKind::IntegratedGpu, ApiVersion::V1_3)
            .with_features(DeviceFeatures::SAMPLER_ANISOTROPY),
    );
    let weak_instance = basic_instance(&weak);
    let weak_physical = weak.enumerate_physical_devices(weak_instance).unwrap()[0];
    let mut config = DeviceConfig::default();
    config.fragments.push(ConfigFragment::CoreFeatures {
        version: ApiVersion::V1_2,
        features: DeviceFeatures::TIMELINE_SEMAPHORE,
    });
    assert_eq!(
        weak.create_device(weak_physical, &config),
        Err(Status::ErrorFeatureNotPresent)
    );
}

#[test]
fn layer_contributed_device_extensions_are_creatable() {
    let icd = MockIcd::conformant();

    // portability_subset comes from the profiles layer, not the device.
    let mut instance_config = InstanceConfig::new("t", ApiVersion::V1_3);
    instance_config.layers.push(layers::PROFILES.to_owned());
    let instance = icd.create_instance(&instance_config).unwrap();
    let physical = icd.enumerate_physical_devices(instance).unwrap()[0];

    let config = DeviceConfig {
        extensions: vec![caps::PORTABILITY_SUBSET.to_owned()],
        ..DeviceConfig::default()
    };
    assert!(icd.create_device(physical, &config).is_ok());

    // Without the layer the same request fails...
    let bare = MockIcd::conformant().with_physical_device(
        MockPhysicalDevice::conformant(DeviceKind::DiscreteGpu, ApiVersion::V1_3)
            .without_extension(caps::PORTABILITY_SUBSET),
    );
    let bare_instance = basic_instance(&bare);
    // ...on the stripped device (index 1).
    let physicals = bare.enumerate_physical_devices(bare_instance).unwrap();
    let config = DeviceConfig {
        extensions: vec![caps::PORTABILITY_SUBSET.to_owned()],
        ..DeviceConfig::default()
    };
    assert_eq!(
        bare.create_device(physicals[1], &config),
        Err(Status::ErrorExtensionNotPresent)
    );
}

#[test]
fn out_of_order_destroy_is_rejected() {
    let icd = MockIcd::conformant();
    let instance = basic_instance(&icd);
    let physical = icd.enumerate_physical_devices(instance).unwrap()[0];
    let device = icd
        .create_device(
            physical,
            &DeviceConfig {
                queues: vec![QueueRequest {
                    family_index: 0,
                    priorities: vec![1.0],
                }],
                ..DeviceConfig::default()
            },
        )
        .unwrap();

    // Instance before device: rejected.
    assert_eq!(
        icd.destroy_instance(instance),
        Err(Status::ErrorValidationFailed)
    );

    // Device with a live pool: rejected.
    let pool = icd.create_command_pool(device, 0).unwrap();
    assert_eq!(icd.destroy_device(device), Err(Status::ErrorValidationFailed));

    icd.destroy_command_pool(device, pool).unwrap();
    icd.destroy_device(device).unwrap();
    icd.destroy_instance(instance).unwrap();

    // Everything is gone now.
    assert_eq!(
        icd.destroy_instance(instance),
        Err(Status::ErrorUnknownHandle)
    );
}

#[test]
fn surface_requires_matching_wsi_extension() {
    let icd = MockIcd::conformant();
    let instance = basic_instance(&icd);
    assert_eq!(
        icd.create_surface(instance, &SurfaceDesc::Headless),
        Err(Status::ErrorExtensionNotPresent)
    );

    let mut config = InstanceConfig::new("t", ApiVersion::V1_3);
    config.extensions.push(caps::SURFACE.to_owned());
    config.extensions.push(caps::SURFACE_HEADLESS.to_owned());
    let instance = icd.create_instance(&config).unwrap();
    let surface = icd
        .create_surface(instance, &SurfaceDesc::Headless)
        .unwrap();
    icd.destroy_surface(instance, surface).unwrap();
}
