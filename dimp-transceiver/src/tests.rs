// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests running messages between the transceivers of several users.
use std::sync::Arc;

use assert_matches::assert_matches;
use dimp_core::codec::Map;
use dimp_core::content::{
    Command, GroupCommand, ReceiptCommand, TextContent, command_names, group_operations,
};
use dimp_core::crypto::Provider;
use dimp_core::test_utils::{Account, GroupAccount};
use dimp_core::{Content, ContentType, Envelope, Id, InstantMessage, ReliableMessage, SecureMessage};
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use crate::barrack::BarrackError;
use crate::config::{Config, WireFormat};
use crate::memory::MemoryDataSource;
use crate::packer::key_digest;
use crate::processor::ProcessorRegistry;
use crate::test_utils::{data_source, setup_logging, transceiver};
use crate::{Transceiver, TransceiverError};

struct Users {
    alice: Account,
    bob: Account,
    carol: Account,
    dave: Account,
}

#[fixture]
fn users() -> Users {
    setup_logging();
    let provider = Provider::from_seed([7; 32]);
    Users {
        alice: Account::generate(&provider, "alice"),
        bob: Account::generate(&provider, "bob"),
        carol: Account::generate(&provider, "carol"),
        dave: Account::generate(&provider, "dave"),
    }
}

fn text(value: &str, sn: u64) -> Content {
    let mut content: Content = TextContent::new(value).into();
    content.base_mut().set("sn", json!(sn));
    content
}

/// Runs an outgoing message through the sender's sending chain up to the wire.
fn send(from: &Transceiver<MemoryDataSource>, instant: &InstantMessage) -> Vec<u8> {
    let secure = from.encrypt_message(instant).unwrap().unwrap();
    let reliable = from.sign_message(&secure).unwrap();
    from.serialize_message(&reliable).unwrap()
}

/// Runs received bytes through the receiving chain.
fn receive(to: &Transceiver<MemoryDataSource>, data: &[u8]) -> Option<InstantMessage> {
    let reliable = to.deserialize_message(data)?;
    let secure = to.verify_message(&reliable).unwrap()?;
    to.decrypt_message(&secure).unwrap()
}

fn wire_map(data: &[u8]) -> Map {
    serde_json::from_slice(data).unwrap()
}

#[rstest]
fn personal_message(users: Users) {
    let Users { alice, bob, .. } = users;
    let alice_node = transceiver(&alice, &[&bob], 1, Config::default());
    let bob_node = transceiver(&bob, &[&alice], 2, Config::default());

    let envelope = Envelope::new(alice.id.clone(), bob.id.clone(), Some(1_700_000_000.0));
    let instant = InstantMessage::new(envelope, text("hi", 1001));
    let data = send(&alice_node, &instant);

    let wire = wire_map(&data);
    assert!(wire.contains_key("key"));
    assert!(!wire.contains_key("keys"));
    assert!(!wire.contains_key("group"));
    assert_eq!(wire.get("type"), Some(&json!("1")));

    let received = receive(&bob_node, &data).unwrap();
    assert_eq!(received.sender(), &alice.id);
    assert_eq!(received.receiver(), &bob.id);
    assert_eq!(received.time(), Some(1_700_000_000.0));
    assert_eq!(received.content().content_type(), ContentType::TEXT);
    assert_eq!(received.content().sn(), 1001);
    assert_eq!(received.content().as_map().get("text"), Some(&json!("hi")));

    // Both ends hold the same key for the direction.
    let sent_key = alice_node.cipher_key(&alice.id, &bob.id, false).unwrap().unwrap();
    let received_key = bob_node.cipher_key(&alice.id, &bob.id, false).unwrap().unwrap();
    assert!(sent_key.matches(received_key.as_ref()));
    assert_eq!(alice_node.key_cache().len(), 1);
    assert_eq!(bob_node.key_cache().len(), 1);
}

#[rstest]
fn key_is_reused_per_direction(users: Users) {
    let Users { alice, bob, .. } = users;
    let alice_node = transceiver(&alice, &[&bob], 1, Config::default());
    let bob_node = transceiver(&bob, &[&alice], 2, Config::default());

    for sn in 1..=3 {
        let envelope = Envelope::new(alice.id.clone(), bob.id.clone(), None);
        let data = send(&alice_node, &InstantMessage::new(envelope, text("again", sn)));
        let received = receive(&bob_node, &data).unwrap();
        assert_eq!(received.content().sn(), sn);
    }
    assert_eq!(alice_node.key_cache().len(), 1);

    // A message without a wrapped key is decrypted with the cached one.
    let envelope = Envelope::new(alice.id.clone(), bob.id.clone(), None);
    let secure = alice_node
        .encrypt_message(&InstantMessage::new(envelope, text("cached", 4)))
        .unwrap()
        .unwrap();
    let mut map = secure.to_map();
    map.remove("key");
    let secure = SecureMessage::from_map(map).unwrap();
    let received = bob_node.decrypt_message(&secure).unwrap().unwrap();
    assert_eq!(received.content().sn(), 4);
}

fn group_nodes(users: &Users, group: &GroupAccount) -> [Transceiver<MemoryDataSource>; 3] {
    let Users { alice, bob, carol, .. } = users;
    let members = vec![alice.id.clone(), bob.id.clone(), carol.id.clone()];
    let nodes = [
        transceiver(alice, &[bob, carol], 1, Config::default()),
        transceiver(bob, &[alice, carol], 2, Config::default()),
        transceiver(carol, &[alice, bob], 3, Config::default()),
    ];
    for node in &nodes {
        let data_source = node.barrack().data_source();
        data_source.set_members(&group.id, members.clone());
        data_source.set_founder(&group.id, &alice.id);
    }
    nodes
}

#[rstest]
fn group_message_exposes_group(users: Users) {
    let group = GroupAccount::generate("team", &users.alice);
    let [alice_node, bob_node, carol_node] = group_nodes(&users, &group);
    let Users { alice, bob, carol, .. } = &users;

    let mut content = text("hello team", 2001);
    content.set_group(Some(&group.id));
    let envelope = Envelope::new(alice.id.clone(), group.id.clone(), None);
    let data = send(&alice_node, &InstantMessage::new(envelope, content));

    let wire = wire_map(&data);
    assert_eq!(wire.get("group"), Some(&json!(group.id.to_string())));
    assert!(!wire.contains_key("key"));
    let keys = wire.get("keys").and_then(Value::as_object).unwrap();
    assert!(keys.contains_key(&bob.id.to_string()));
    assert!(keys.contains_key(&carol.id.to_string()));
    assert!(!keys.contains_key(&alice.id.to_string()));

    let sent_key = alice_node.cipher_key(&alice.id, &group.id, false).unwrap().unwrap();
    assert_eq!(
        keys.get("digest"),
        Some(&json!(key_digest(sent_key.as_ref()).unwrap()))
    );

    for (node, member) in [(&bob_node, bob), (&carol_node, carol)] {
        let received = receive(node, &data).unwrap();
        assert_eq!(received.receiver(), &member.id);
        assert_eq!(received.group(), Some(group.id.clone()));
        assert_eq!(received.content().sn(), 2001);

        let key = node.cipher_key(&alice.id, &group.id, false).unwrap().unwrap();
        assert!(key.matches(sent_key.as_ref()));
        assert!(node.cipher_key(&alice.id, &member.id, false).unwrap().is_none());
    }
}

#[rstest]
fn group_command_hides_group(users: Users) {
    let group = GroupAccount::generate("team", &users.alice);
    let [alice_node, bob_node, _] = group_nodes(&users, &group);
    let Users { alice, bob, .. } = &users;

    let command = GroupCommand::new(
        group_operations::RESET,
        &group.id,
        &[alice.id.clone(), bob.id.clone()],
    );
    let content = Content::Command(Command::Group(command));
    let envelope = Envelope::new(alice.id.clone(), bob.id.clone(), None);
    let data = send(&alice_node, &InstantMessage::new(envelope, content));

    let wire = wire_map(&data);
    assert!(wire.contains_key("key"));
    assert!(!wire.contains_key("keys"));
    assert!(!wire.contains_key("group"));

    let received = receive(&bob_node, &data).unwrap();
    assert_eq!(received.group(), None);
    assert_eq!(received.content().content_type(), ContentType::HISTORY);
    assert_eq!(received.content().group(), Some(group.id.clone()));

    for node in [&alice_node, &bob_node] {
        assert!(node.cipher_key(&alice.id, &bob.id, false).unwrap().is_some());
        assert!(node.cipher_key(&alice.id, &group.id, false).unwrap().is_none());
    }
}

#[rstest]
fn broadcast_message_is_plain(users: Users) {
    let Users { alice, bob, .. } = users;
    let alice_node = transceiver(&alice, &[&bob], 1, Config::default());
    let bob_node = transceiver(&bob, &[&alice], 2, Config::default());

    let envelope = Envelope::new(alice.id.clone(), Id::anyone(), None);
    let data = send(&alice_node, &InstantMessage::new(envelope, text("hello world", 3001)));

    let wire = wire_map(&data);
    assert!(!wire.contains_key("key"));
    assert!(!wire.contains_key("keys"));
    assert!(wire.contains_key("signature"));
    let plain = wire.get("data").and_then(Value::as_str).unwrap();
    let content: Map = serde_json::from_str(plain).unwrap();
    assert_eq!(content.get("text"), Some(&json!("hello world")));

    let received = receive(&bob_node, &data).unwrap();
    assert_eq!(received.receiver(), &Id::anyone());
    assert_eq!(received.content().sn(), 3001);

    // Broadcast keys are never cached.
    assert!(alice_node.key_cache().is_empty());
    assert!(bob_node.key_cache().is_empty());
}

#[rstest]
fn broadcast_group_to_single_user(users: Users) {
    let Users { alice, bob, .. } = users;
    let alice_node = transceiver(&alice, &[&bob], 1, Config::default());
    let bob_node = transceiver(&bob, &[&alice], 2, Config::default());

    // Both ends already share a personal key for alice to bob.
    let envelope = Envelope::new(alice.id.clone(), bob.id.clone(), None);
    let data = send(&alice_node, &InstantMessage::new(envelope, text("hi", 3101)));
    assert!(receive(&bob_node, &data).is_some());

    let mut content = text("hello everyone", 3102);
    content.set_group(Some(&Id::everyone()));
    let envelope = Envelope::new(alice.id.clone(), bob.id.clone(), None);
    let data = send(&alice_node, &InstantMessage::new(envelope, content));

    let wire = wire_map(&data);
    assert!(!wire.contains_key("key"));
    assert!(!wire.contains_key("keys"));
    assert_eq!(wire.get("group"), Some(&json!("everyone@everywhere")));
    let plain = wire.get("data").and_then(Value::as_str).unwrap();
    let content: Map = serde_json::from_str(plain).unwrap();
    assert_eq!(content.get("text"), Some(&json!("hello everyone")));

    let received = receive(&bob_node, &data).unwrap();
    assert_eq!(received.receiver(), &bob.id);
    assert_eq!(received.content().sn(), 3102);
    assert_eq!(received.content().group(), Some(Id::everyone()));

    // Only the personal key is cached.
    assert_eq!(alice_node.key_cache().len(), 1);
    assert_eq!(bob_node.key_cache().len(), 1);
}

#[rstest]
fn unknown_receiver_key_suspends(users: Users) {
    let Users { alice, dave, .. } = users;
    let alice_node = transceiver(&alice, &[], 1, Config::default());

    let envelope = Envelope::new(alice.id.clone(), dave.id.clone(), None);
    let instant = InstantMessage::new(envelope, text("are you there?", 4001));
    assert_matches!(alice_node.encrypt_message(&instant), Ok(None));

    // Once dave's documents arrive the same message goes out.
    assert!(alice_node.barrack().save_meta(&dave.meta, &dave.id));
    assert!(alice_node.barrack().save_document(&dave.visa));
    assert_matches!(alice_node.encrypt_message(&instant), Ok(Some(_)));
}

#[rstest]
fn malformed_signature_is_dropped(users: Users) {
    let Users { alice, bob, .. } = users;
    let alice_node = transceiver(&alice, &[&bob], 1, Config::default());
    let bob_node = transceiver(&bob, &[&alice], 2, Config::default());

    let envelope = Envelope::new(alice.id.clone(), bob.id.clone(), None);
    let instant = InstantMessage::new(envelope, text("hi", 5001));
    let secure = alice_node.encrypt_message(&instant).unwrap().unwrap();
    let mut map = alice_node.sign_message(&secure).unwrap().to_map();
    map.insert("signature".into(), json!("!!!"));
    let reliable = ReliableMessage::from_map(map).unwrap();

    assert_matches!(bob_node.verify_message(&reliable), Ok(None));
    assert_matches!(bob_node.process_reliable(&reliable), Ok(None));
    assert!(bob_node.key_cache().is_empty());
}

#[rstest]
fn tampered_data_fails_verification(users: Users) {
    let Users { alice, bob, .. } = users;
    let alice_node = transceiver(&alice, &[&bob], 1, Config::default());
    let bob_node = transceiver(&bob, &[&alice], 2, Config::default());

    let envelope = Envelope::new(alice.id.clone(), bob.id.clone(), None);
    let instant = InstantMessage::new(envelope, text("hi", 5002));
    let secure = alice_node.encrypt_message(&instant).unwrap().unwrap();
    let mut map = alice_node.sign_message(&secure).unwrap().to_map();
    map.remove("signature");
    let unsigned = ReliableMessage::from_map(map.clone()).unwrap();
    assert_matches!(bob_node.verify_message(&unsigned), Ok(None));

    let signed = alice_node.sign_message(&secure).unwrap();
    let mut map = signed.to_map();
    map.insert("sender".into(), json!(bob.id.to_string()));
    let forged = ReliableMessage::from_map(map).unwrap();
    assert_matches!(bob_node.verify_message(&forged), Ok(None));
}

#[rstest]
fn unknown_group_membership(users: Users) {
    let group = GroupAccount::generate("team", &users.alice);
    let Users { alice, bob, .. } = &users;
    let alice_node = transceiver(alice, &[bob], 1, Config::default());
    let bob_node = transceiver(bob, &[alice], 2, Config::default());

    let mut content = text("anyone here?", 6001);
    content.set_group(Some(&group.id));
    let envelope = Envelope::new(alice.id.clone(), group.id.clone(), None);
    let instant = InstantMessage::new(envelope, content);
    assert_matches!(alice_node.encrypt_message(&instant), Ok(None));

    alice_node
        .barrack()
        .data_source()
        .set_members(&group.id, vec![alice.id.clone(), bob.id.clone()]);
    let data = send(&alice_node, &instant);

    // The receiver doesn't know the members yet.
    assert!(receive(&bob_node, &data).is_none());

    bob_node
        .barrack()
        .data_source()
        .set_members(&group.id, vec![alice.id.clone(), bob.id.clone()]);
    assert!(receive(&bob_node, &data).is_some());
}

#[rstest]
fn compact_wire_format(users: Users) {
    let Users { alice, bob, .. } = users;
    let config = Config {
        wire_format: WireFormat::Compact,
        ..Config::default()
    };
    let alice_node = transceiver(&alice, &[&bob], 1, config);
    let bob_node = transceiver(&bob, &[&alice], 2, Config::default());

    let envelope = Envelope::new(alice.id.clone(), bob.id.clone(), None);
    let data = send(&alice_node, &InstantMessage::new(envelope, text("short", 7001)));

    let wire = wire_map(&data);
    for key in ["S", "R", "W", "T", "D", "V", "K"] {
        assert!(wire.contains_key(key), "missing {key}");
    }
    for key in ["sender", "receiver", "data", "signature", "key"] {
        assert!(!wire.contains_key(key), "unexpected {key}");
    }

    let received = receive(&bob_node, &data).unwrap();
    assert_eq!(received.content().sn(), 7001);
}

#[rstest]
fn attached_meta_introduces_sender(users: Users) {
    let Users { alice, bob, .. } = users;
    let config = Config {
        attach_meta: true,
        ..Config::default()
    };
    let alice_node = transceiver(&alice, &[&bob], 1, config);
    let plain_node = transceiver(&alice, &[&bob], 1, Config::default());
    // Bob has never seen alice.
    let bob_node = transceiver(&bob, &[], 2, Config::default());

    let envelope = Envelope::new(alice.id.clone(), bob.id.clone(), None);
    let instant = InstantMessage::new(envelope, text("nice to meet you", 8001));

    let data = send(&plain_node, &instant);
    assert!(receive(&bob_node, &data).is_none());

    let data = send(&alice_node, &instant);
    let wire = wire_map(&data);
    assert!(wire.contains_key("meta"));
    assert!(wire.contains_key("visa"));

    let received = receive(&bob_node, &data).unwrap();
    assert_eq!(received.content().sn(), 8001);
    assert!(bob_node.barrack().meta(&alice.id).is_some());
    assert!(bob_node.barrack().visa(&alice.id).is_some());
}

#[rstest]
fn reply_through_processor(users: Users) {
    let Users { alice, bob, .. } = users;
    let alice_node = transceiver(&alice, &[&bob], 1, Config::default());

    let mut processors = ProcessorRegistry::new();
    processors.register_content_processor(
        ContentType::TEXT,
        Box::new(|content, reliable| {
            let receipt =
                ReceiptCommand::new("received", Some(reliable.envelope()), Some(content.sn()));
            Some(Content::Command(Command::Receipt(receipt)))
        }),
    );
    let bob_node = Transceiver::builder(data_source(&bob, &[&alice]))
        .provider(Arc::new(Provider::from_seed([2; 32])))
        .processors(processors)
        .build();

    let envelope = Envelope::new(alice.id.clone(), bob.id.clone(), None);
    let data = send(&alice_node, &InstantMessage::new(envelope, text("ping", 9001)));

    let reply = bob_node.process_data(&data).unwrap().unwrap();
    let received = receive(&alice_node, &reply).unwrap();
    assert_eq!(received.sender(), &bob.id);
    assert_eq!(received.receiver(), &alice.id);

    let command = received.content().as_command().unwrap();
    assert_eq!(command.name(), command_names::RECEIPT);
    let origin = command.base().as_map().get("origin").unwrap();
    assert_eq!(origin.get("sn"), Some(&json!(9001)));
    assert_eq!(origin.get("sender"), Some(&json!(alice.id.to_string())));

    // Alice registered nothing, the receipt ends the conversation.
    assert_matches!(alice_node.process_data(&reply), Ok(None));
}

#[rstest]
fn malformed_packets_are_ignored(users: Users) {
    let Users { alice, bob, .. } = users;
    let bob_node = transceiver(&bob, &[&alice], 2, Config::default());

    assert_matches!(bob_node.process_data(b"not json"), Ok(None));
    assert_matches!(bob_node.process_data(b"[1, 2, 3]"), Ok(None));
    assert_matches!(bob_node.process_data(b"{\"data\": \"abc\"}"), Ok(None));
}

#[test]
fn node_without_local_users() {
    let transceiver = Transceiver::builder(MemoryDataSource::new()).build();
    assert_matches!(
        transceiver.select_local_user(&Id::anyone()),
        Err(TransceiverError::Barrack(BarrackError::NoLocalUser))
    );
}
