use flate2::read::GzDecoder;
use mediastore_db::{MediaRepository, MemoryDocumentStore};
use mediastore_services::ArchiveExporter;
use mediastore_storage::{MemoryStorage, Storage};
use std::io::Read;
use std::sync::Arc;

const BLOCK: usize = 512;

fn octal(field: &[u8]) -> u64 {
    let digits: String = field
        .iter()
        .take_while(|&&b| b != 0 && b != b' ')
        .map(|&b| b as char)
        .collect();
    u64::from_str_radix(&digits, 8).unwrap()
}

#[tokio::test]
async fn every_header_checksum_and_block_alignment_holds() {
    let dir = tempfile::tempdir().unwrap();
    let storage = MemoryStorage::new("media");
    let files: [(&str, usize); 4] = [
        ("docs/original/a.pdf", 1),
        ("docs/original/b.pdf", 512),
        ("docs/original/c.pdf", 513),
        ("img/original/d.jpg", 5000),
    ];
    for (path, len) in files {
        storage.save(&vec![b'x'; len], path).await.unwrap();
    }

    let exporter = ArchiveExporter::new(
        Arc::new(storage),
        MediaRepository::new(Arc::new(MemoryDocumentStore::new()), "media"),
        dir.path(),
    );
    let paths: Vec<String> = files.iter().map(|(p, _)| p.to_string()).collect();
    let archive = exporter.export(&paths).await.unwrap();
    assert_eq!(archive.entries, 4);

    let mut tar = Vec::new();
    GzDecoder::new(std::fs::File::open(&archive.path).unwrap())
        .read_to_end(&mut tar)
        .unwrap();

    assert_eq!(tar.len() % BLOCK, 0);
    assert!(tar[tar.len() - 2 * BLOCK..].iter().all(|&b| b == 0));

    let mut offset = 0;
    for (path, len) in files {
        let header = &tar[offset..offset + BLOCK];
        let name = path.rsplit('/').next().unwrap();
        assert_eq!(&header[..name.len()], name.as_bytes());
        assert_eq!(octal(&header[124..136]), len as u64);
        assert_eq!(header[156], b'0');

        let expected: u64 = header
            .iter()
            .enumerate()
            .map(|(i, &b)| if (148..156).contains(&i) { b' ' as u64 } else { b as u64 })
            .sum();
        assert_eq!(octal(&header[148..156]), expected);
        assert_eq!(header[154], 0);
        assert_eq!(header[155], b' ');

        offset += BLOCK + len.div_ceil(BLOCK) * BLOCK;
    }
    assert_eq!(offset + 2 * BLOCK, tar.len());
}
