//! End-to-end protocol flows against a scripted transport.
//!
//! Each test drives a full session the way a real client would (connect,
//! issue commands, transfer data) with every frame the driver is allowed to
//! send pinned byte for byte by the mock transport's script.

use rm200::{
    Aperture, AssetType, CatalogEntry, DeviceMode, DeviceSession, Exchange, FlashUpdater,
    MockTransport, TransferOptions,
};

fn negotiate(buffer_size: u32) -> Exchange {
    Exchange::ok(&[0x78, 0x11], &buffer_size.to_be_bytes())
}

fn open_frame(mode: u8, name: &str) -> Vec<u8> {
    let mut frame = vec![0x77, 0x20, mode];
    frame.extend_from_slice(name.as_bytes());
    frame.push(0);
    frame
}

fn write_frame(chunk: &[u8]) -> Vec<u8> {
    let mut frame = vec![0x77, 0x23];
    frame.extend_from_slice(&(chunk.len() as u32).to_be_bytes());
    frame.extend_from_slice(chunk);
    frame
}

fn read_response(chunk: &[u8]) -> Vec<u8> {
    let mut payload = (chunk.len() as u32).to_be_bytes().to_vec();
    payload.extend_from_slice(chunk);
    payload
}

#[test]
fn identity_flow_reads_device_details() {
    let _ = tracing_subscriber::fmt::try_init();
    let mut info = 3u32.to_be_bytes().to_vec();
    info.extend_from_slice(b"RM200-00417\0HW-B\0eu\0");

    let transport = MockTransport::new(vec![
        negotiate(1024),
        Exchange::ok(&[0x78, 0x12], &info),
        Exchange::ok(&[0x77, 0x01], b"2.16   RM200\0"),
        Exchange::ok(&[0x78, 0x2d], b"2.41   Bootloader\0"),
        Exchange::ok(&[0x78, 0x07], &[0x01, 0x02, 0xfe]),
    ]);

    let mut session = DeviceSession::connect(transport).unwrap();
    assert_eq!(session.buffer_size(), 1024);
    assert_eq!(
        session.device_info().unwrap(),
        vec!["RM200-00417", "HW-B", "eu"]
    );
    assert_eq!(session.firmware_version().unwrap(), "2.16   RM200");
    assert_eq!(session.bootloader_version().unwrap(), "2.41   Bootloader");
    assert_eq!(session.chip_id().unwrap(), "0x0102fe");
    assert!(session.disconnect().unwrap().script_drained());
}

#[test]
fn two_thousand_byte_upload_is_three_chunks_and_a_close() {
    let _ = tracing_subscriber::fmt::try_init();
    // Buffer 1024 minus the 40-byte overhead: chunks of 984, 984 and 32 at
    // offsets 0, 984 and 1968, then a single close.
    let data: Vec<u8> = (0..2000u32).map(|i| (i % 251) as u8).collect();
    let transport = MockTransport::new(vec![
        negotiate(1024),
        Exchange::ok(&open_frame(2, "Deck.dat"), &[]),
        Exchange::ok(&write_frame(&data[0..984]), &[]),
        Exchange::ok(&write_frame(&data[984..1968]), &[]),
        Exchange::ok(&write_frame(&data[1968..2000]), &[]),
        Exchange::ok(&[0x77, 0x21], &[]),
    ]);

    let mut session = DeviceSession::connect(transport).unwrap();
    session.upload_file("Deck.dat", &data).unwrap();
    assert!(session.disconnect().unwrap().script_drained());
}

#[test]
fn catalog_survives_a_full_upload_download_cycle() {
    let _ = tracing_subscriber::fmt::try_init();
    let entries = vec![
        CatalogEntry {
            asset_type: AssetType::Firmware,
            identifier: "FW".into(),
            name: "RM200 Firmware".into(),
            sku: "RM200-FW".into(),
            description: "Main image".into(),
            version: "2.16".into(),
            size: 524288,
            filename: "Firmware.bin".into(),
        },
        CatalogEntry {
            asset_type: AssetType::ColorDeck,
            identifier: "FGS-C".into(),
            name: "Formula Guide Solid Coated".into(),
            sku: "GP1601N".into(),
            description: "Coated deck".into(),
            version: "1.3".into(),
            size: 91204,
            filename: "FGSC.pcd".into(),
        },
    ];
    let file = rm200::encode_catalog(&entries).unwrap();
    assert!(file.len() <= 984, "test assumes a single-chunk catalog");

    let transport = MockTransport::new(vec![
        negotiate(1024),
        // upload
        Exchange::ok(&open_frame(2, "Versions.dat"), &[]),
        Exchange::ok(&write_frame(&file), &[]),
        Exchange::ok(&[0x77, 0x21], &[]),
        // download
        Exchange::ok(&open_frame(1, "Versions.dat"), &[]),
        Exchange::ok(&[0x77, 0x22], &read_response(&file)),
        Exchange::ok(&[0x77, 0x22], &read_response(&[])),
        Exchange::ok(&[0x77, 0x21], &[]),
    ]);

    let mut session = DeviceSession::connect(transport).unwrap();
    session.upload_file("Versions.dat", &file).unwrap();
    let downloaded = session.download_file("Versions.dat").unwrap();
    assert_eq!(rm200::decode_catalog(&downloaded).unwrap(), entries);
    assert!(session.disconnect().unwrap().script_drained());
}

#[test]
fn firmware_update_flow_enters_bootloader_then_stages_and_commits() {
    let _ = tracing_subscriber::fmt::try_init();
    let image = vec![0x5au8; 1500];

    let mut chunk0 = vec![0x77, 0x12];
    chunk0.extend_from_slice(&0u32.to_be_bytes());
    chunk0.extend_from_slice(&984u32.to_be_bytes());
    chunk0.extend_from_slice(&image[..984]);

    let mut chunk1 = vec![0x77, 0x12];
    chunk1.extend_from_slice(&984u32.to_be_bytes());
    chunk1.extend_from_slice(&516u32.to_be_bytes());
    chunk1.extend_from_slice(&image[984..]);

    let mut commit = vec![0x77, 0x13, 0x02];
    commit.extend_from_slice(&1500u32.to_be_bytes());

    let transport = MockTransport::new(vec![
        negotiate(1024),
        Exchange::ok(&[0x78, 0x10, 0x87, 0xef, 0x3a, 0x1a], &[]),
        // After re-enumeration the client renegotiates; the bootloader
        // answers the same query.
        negotiate(1024),
        Exchange::ok(&chunk0, &[]),
        Exchange::ok(&chunk1, &[]),
        Exchange::ok(&commit, &[]),
    ]);

    let mut session = DeviceSession::connect(transport).unwrap();
    assert!(session.enter_bootloader().unwrap());
    session.negotiate_buffer_size().unwrap();
    FlashUpdater::new(&mut session).flash_firmware(&image).unwrap();
    assert!(session.disconnect().unwrap().script_drained());
}

#[test]
fn mode_and_measurement_flow() {
    let _ = tracing_subscriber::fmt::try_init();
    let transport = MockTransport::new(vec![
        negotiate(1024),
        Exchange::ok(&[0x78, 0x2a], &[0x01]),
        Exchange::ok(&[0x78, 0x29, 0x04], &[]),
        Exchange::ok(&[0x78, 0x25], &[0x01]),
        Exchange::ok(&[0x78, 0x35, 0x02], &[]),
    ]);

    let mut session = DeviceSession::connect(transport).unwrap();
    assert_eq!(session.device_mode().unwrap(), DeviceMode::General);
    assert!(session.set_device_mode(DeviceMode::Remote).unwrap());
    assert_eq!(session.aperture().unwrap(), Aperture::Medium);
    assert!(session.trigger_measurement(Aperture::Large).unwrap());
    assert!(session.disconnect().unwrap().script_drained());
}

#[test]
fn overhead_is_tunable_per_session() {
    let _ = tracing_subscriber::fmt::try_init();
    // A hypothetical firmware revision with a 64-byte overhead: 1024 - 64
    // leaves 960-byte chunks.
    let data = vec![0x11u8; 1000];
    let transport = MockTransport::new(vec![
        negotiate(1024),
        Exchange::ok(&open_frame(2, "f"), &[]),
        Exchange::ok(&write_frame(&data[..960]), &[]),
        Exchange::ok(&write_frame(&data[960..]), &[]),
        Exchange::ok(&[0x77, 0x21], &[]),
    ]);

    let mut session = DeviceSession::connect_with_options(
        transport,
        TransferOptions { chunk_overhead: 64, write_eof_chunk: false },
    )
    .unwrap();
    session.upload_file("f", &data).unwrap();
    assert!(session.disconnect().unwrap().script_drained());
}

#[test]
fn every_command_announces_its_frame_length() {
    let _ = tracing_subscriber::fmt::try_init();
    let transport = MockTransport::new(vec![
        negotiate(1024),
        Exchange::ok(&[0x77, 0x24], &0u32.to_be_bytes()),
        Exchange::ok(&[0x77, 0x25, b'a', 0], &[]),
    ]);

    let mut session = DeviceSession::connect(transport).unwrap();
    session.list_files().unwrap();
    session.delete_file("a").unwrap();
    let transport = session.disconnect().unwrap();
    // 78 11 (2 bytes), 77 24 (2 bytes), 77 25 + "a" + NUL (4 bytes)
    assert_eq!(transport.announced(), &[2, 2, 4]);
}
