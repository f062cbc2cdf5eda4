#![no_main]

use libfuzzer_sys::fuzz_target;
use replica::{
    decode_delta_packet, encode_delta_packet, ClientReplicator, NetworkObject, ObjectId,
    PacketLimits, ReplicatedAnimation, ReplicatedAnimationState, ReplicatedTransform,
    ReplicationConfig, TransformSettings,
};

fuzz_target!(|data: &[u8]| {
    let limits = PacketLimits::for_testing();
    let Ok(packet) = decode_delta_packet(data, &limits) else {
        return;
    };

    // Varints may be non-canonical on input, so compare decoded forms.
    let encoded = encode_delta_packet(&packet).expect("re-encode decoded packet");
    let reparsed = decode_delta_packet(&encoded, &PacketLimits::unlimited()).expect("re-decode");
    assert_eq!(reparsed, packet);

    let config = ReplicationConfig::for_testing();
    let Ok(mut client) = ClientReplicator::new(&config, limits) else {
        return;
    };
    for id in 0..4 {
        let object = NetworkObject::new(ObjectId::new(id))
            .with_behavior(ReplicatedTransform::new(&config, TransformSettings::default()))
            .and_then(|object| object.with_behavior(ReplicatedAnimation::new(&config, 2)))
            .and_then(|object| {
                object.with_behavior(ReplicatedAnimationState::new(&config, vec![1.0]))
            });
        if let Ok(object) = object {
            let _ = client.add_object(object);
        }
    }

    let mut forged = packet;
    forged.protocol_hash = config.protocol_hash();
    let _ = client.apply_delta_packet(&forged);
});
