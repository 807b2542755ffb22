fn main() {
    // tch links against libtorch: LIBTORCH wins, otherwise assume a local
    // ./libtorch checkout.
    let libtorch = std::env::var("LIBTORCH")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("libtorch"));

    println!("cargo:rustc-link-search=native={}/lib", libtorch.display());
    println!("cargo:rustc-link-lib=dylib=torch");
    println!("cargo:rustc-link-lib=dylib=c10");

    println!("cargo:include={}/include", libtorch.display());
    println!(
        "cargo:include={}/include/torch/csrc/api/include",
        libtorch.display()
    );
}
