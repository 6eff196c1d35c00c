fn main() {
    protobuf_codegen::Codegen::new()
        .pure()
        .includes(["src/proto"])
        .input("src/proto/update_metadata.proto")
        .cargo_out_dir("protos")
        .run_from_script();
}
