use std::sync::OnceLock;

/// Tests backed by `httpmock` need a localhost listener. Sandboxes that deny
/// the bind get an early return instead of a failure; the bind check runs once
/// per test binary.
pub fn should_skip_httpmock() -> bool {
    static LOCALHOST_BINDABLE: OnceLock<bool> = OnceLock::new();
    let bindable = *LOCALHOST_BINDABLE.get_or_init(|| {
        match std::net::TcpListener::bind(("127.0.0.1", 0)) {
            Ok(_) => true,
            Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
                eprintln!("image tool http tests disabled: localhost bind denied");
                false
            }
            Err(err) => panic!("cannot bind localhost for mock image servers: {err}"),
        }
    });
    !bindable
}

/// A tiny valid PNG (2x2, RGB) for provider and storage fixtures.
pub fn tiny_png() -> Vec<u8> {
    let image = image::RgbImage::from_pixel(2, 2, image::Rgb([200, 40, 40]));
    let mut out = std::io::Cursor::new(Vec::<u8>::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encode fixture png");
    out.into_inner()
}
