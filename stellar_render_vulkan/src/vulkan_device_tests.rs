use super::*;

// ============================================================================
// PHYSICAL DEVICE PREFERENCE
// ============================================================================

#[test]
fn test_discrete_gpu_preferred_over_integrated() {
    assert!(device_type_score(vk::PhysicalDeviceType::DISCRETE_GPU)
        > device_type_score(vk::PhysicalDeviceType::INTEGRATED_GPU));
}

#[test]
fn test_cpu_and_other_devices_rank_last() {
    let virtual_gpu = device_type_score(vk::PhysicalDeviceType::VIRTUAL_GPU);
    assert!(device_type_score(vk::PhysicalDeviceType::CPU) < virtual_gpu);
    assert_eq!(device_type_score(vk::PhysicalDeviceType::CPU),
        device_type_score(vk::PhysicalDeviceType::OTHER));
}
