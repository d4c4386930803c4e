use secrecy::SecretString;
use veil_crypto::{derive_key, open, seal, DerivedKey, KdfParams, Salt, KEY_SIZE};

fn make_data(size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
        .collect()
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_seal(bencher: divan::Bencher, size: usize) {
    let key = DerivedKey::from_bytes([0xABu8; KEY_SIZE]);
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| seal(divan::black_box(&data), divan::black_box(&key)).unwrap());
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_open(bencher: divan::Bencher, size: usize) {
    let key = DerivedKey::from_bytes([0xABu8; KEY_SIZE]);
    let data = make_data(size);
    let (nonce, ciphertext) = seal(&data, &key).unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            open(
                divan::black_box(&ciphertext),
                divan::black_box(&key),
                divan::black_box(&nonce),
            )
            .unwrap()
        });
}

#[divan::bench(sample_count = 10)]
fn bench_derive_key() -> DerivedKey {
    let secret = SecretString::from("correct-horse-battery");
    let salt = Salt::from_bytes([7u8; 16]);
    derive_key(
        divan::black_box(&secret),
        divan::black_box(&salt),
        &KdfParams::default(),
    )
    .unwrap()
}

fn main() {
    divan::main();
}
