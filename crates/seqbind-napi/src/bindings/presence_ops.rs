//! The presence operation set shared by `PresenceTable` and `LabelTable`.
//!
//! `$class` must provide `fn shared(&self) -> napi::Result<Shared<$engine>>`
//! with `$engine: PresenceOps + Send + 'static`, and a
//! `engine: EngineHandle<Shared<$engine>>` field.

macro_rules! presence_ops {
    ($class:ident, $engine:ty) => {
        impl $class {
            /// Run `f` on the engine from the JS thread. Fails with
            /// `RESOURCE_BUSY` while a task holds the engine.
            fn with_engine<T>(&self, f: impl FnOnce(&mut $engine) -> T) -> napi::Result<T> {
                let engine = self.shared()?;
                let mut guard = try_lock(&engine, stringify!($class))?;
                Ok(f(&mut guard))
            }
        }

        #[napi]
        impl $class {
            #[napi(getter)]
            pub fn ksize(&self) -> napi::Result<u32> {
                self.with_engine(|e| e.ksize())
            }

            #[napi]
            pub fn hashsizes(&self) -> napi::Result<Vec<i64>> {
                let sizes = self.with_engine(|e| e.hashsizes())?;
                Ok(sizes.into_iter().map(count_to_js).collect())
            }

            /// Count every k-mer of `seq`. Returns the number of k-mers.
            #[napi]
            pub fn consume(&self, seq: String) -> napi::Result<i64> {
                self.with_engine(|e| count_to_js(e.consume(&seq)))
            }

            #[napi]
            pub fn count(&self, kmer: String) -> napi::Result<()> {
                self.with_engine(|e| e.count(&kmer))?.map_err(to_napi_error)
            }

            #[napi]
            pub fn get(&self, kmer: String) -> napi::Result<u32> {
                self.with_engine(|e| e.get(&kmer))?.map_err(to_napi_error)
            }

            #[napi]
            pub fn n_unique_kmers(&self) -> napi::Result<i64> {
                self.with_engine(|e| count_to_js(e.n_unique_kmers()))
            }

            #[napi]
            pub fn n_occupied(&self) -> napi::Result<i64> {
                self.with_engine(|e| count_to_js(e.n_occupied()))
            }

            #[napi]
            pub fn n_tags(&self) -> napi::Result<u32> {
                self.with_engine(|e| e.n_tags() as u32)
            }

            #[napi]
            pub fn add_tag(&self, kmer: String) -> napi::Result<()> {
                self.with_engine(|e| e.add_tag(&kmer))?.map_err(to_napi_error)
            }

            #[napi]
            pub fn add_stop_tag(&self, kmer: String) -> napi::Result<()> {
                self.with_engine(|e| e.add_stop_tag(&kmer))?.map_err(to_napi_error)
            }

            #[napi]
            pub fn get_tagset(&self) -> napi::Result<Vec<String>> {
                self.with_engine(|e| e.get_tagset())?.map_err(to_napi_error)
            }

            #[napi]
            pub fn get_stop_tags(&self) -> napi::Result<Vec<String>> {
                self.with_engine(|e| e.get_stop_tags())?.map_err(to_napi_error)
            }

            #[napi(getter)]
            pub fn tag_density(&self) -> napi::Result<u32> {
                self.with_engine(|e| e.tag_density())
            }

            #[napi(setter, js_name = "tagDensity")]
            pub fn set_tag_density(&self, density: u32) -> napi::Result<()> {
                self.with_engine(|e| e.set_tag_density(density))
            }

            #[napi]
            pub fn consume_and_tag(&self, seq: String) -> napi::Result<i64> {
                self.with_engine(|e| count_to_js(e.consume_and_tag(&seq)))
            }

            /// Prefix of `seq` before its first stop-tagged k-mer.
            #[napi]
            pub fn trim_on_stoptags(&self, seq: String) -> napi::Result<JsTrimResult> {
                let (sequence, length) = self.with_engine(|e| e.trim_on_stoptags(&seq))?;
                Ok(JsTrimResult {
                    sequence,
                    length: length as u32,
                })
            }

            #[napi]
            pub fn consume_file(
                &self,
                parser: &ReadParser,
                env: Env,
                observer: JsUnknown,
            ) -> napi::Result<AsyncTask<EngineTask<ConsumeStats, JsConsumeResult>>> {
                let engine = self.shared()?;
                let bridge = runtime::get()?.bridge(&observer_choice(&env, observer)?);
                let mut stream = consumer(parser);
                Ok(AsyncTask::new(EngineTask::new(
                    move || lock(&engine).consume_file(&mut stream, &bridge),
                    |stats| Ok(JsConsumeResult::from(stats)),
                )))
            }

            #[napi]
            pub fn consume_file_and_tag(
                &self,
                parser: &ReadParser,
                env: Env,
                observer: JsUnknown,
            ) -> napi::Result<AsyncTask<EngineTask<ConsumeStats, JsConsumeResult>>> {
                let engine = self.shared()?;
                let bridge = runtime::get()?.bridge(&observer_choice(&env, observer)?);
                let mut stream = consumer(parser);
                Ok(AsyncTask::new(EngineTask::new(
                    move || lock(&engine).consume_file_and_tag(&mut stream, &bridge),
                    |stats| Ok(JsConsumeResult::from(stats)),
                )))
            }

            /// `consumeFileAndTag` that neither counts nor tags stop-tagged
            /// k-mers.
            #[napi]
            pub fn consume_file_and_tag_with_stoptags(
                &self,
                parser: &ReadParser,
                env: Env,
                observer: JsUnknown,
            ) -> napi::Result<AsyncTask<EngineTask<ConsumeStats, JsConsumeResult>>> {
                let engine = self.shared()?;
                let bridge = runtime::get()?.bridge(&observer_choice(&env, observer)?);
                let mut stream = consumer(parser);
                Ok(AsyncTask::new(EngineTask::new(
                    move || {
                        lock(&engine).consume_file_and_tag_with_stoptags(&mut stream, &bridge)
                    },
                    |stats| Ok(JsConsumeResult::from(stats)),
                )))
            }

            /// Write records with no k-mer in the table to `out`. `units` of
            /// the result counts the records written.
            #[napi]
            pub fn filter_if_present(
                &self,
                parser: &ReadParser,
                out: String,
                env: Env,
                observer: JsUnknown,
            ) -> napi::Result<AsyncTask<EngineTask<ConsumeStats, JsConsumeResult>>> {
                let engine = self.shared()?;
                let bridge = runtime::get()?.bridge(&observer_choice(&env, observer)?);
                let mut stream = consumer(parser);
                Ok(AsyncTask::new(EngineTask::new(
                    move || {
                        lock(&engine).filter_if_present(&mut stream, Path::new(&out), &bridge)
                    },
                    |stats| Ok(JsConsumeResult::from(stats)),
                )))
            }

            /// Consume a file written by `outputPartitions`, restoring tags and
            /// partitions from the ids on its headers.
            #[napi]
            pub fn consume_partitioned_file(
                &self,
                parser: &ReadParser,
                env: Env,
                observer: JsUnknown,
            ) -> napi::Result<AsyncTask<EngineTask<ConsumeStats, JsConsumeResult>>> {
                let engine = self.shared()?;
                let bridge = runtime::get()?.bridge(&observer_choice(&env, observer)?);
                let mut stream = consumer(parser);
                Ok(AsyncTask::new(EngineTask::new(
                    move || lock(&engine).consume_partitioned_file(&mut stream, &bridge),
                    |stats| Ok(JsConsumeResult::from(stats)),
                )))
            }

            /// Write every record to `out` with its partition id appended to
            /// the header. Unpartitioned records are written with id 0 only
            /// when `outputUnassigned` is set.
            #[napi]
            pub fn output_partitions(
                &self,
                parser: &ReadParser,
                out: String,
                output_unassigned: Option<bool>,
                env: Env,
                observer: JsUnknown,
            ) -> napi::Result<AsyncTask<EngineTask<PartitionOutput, JsPartitionOutput>>> {
                let engine = self.shared()?;
                let bridge = runtime::get()?.bridge(&observer_choice(&env, observer)?);
                let mut stream = consumer(parser);
                let unassigned = output_unassigned.unwrap_or(false);
                Ok(AsyncTask::new(EngineTask::new(
                    move || {
                        let out = Path::new(&out);
                        lock(&engine).output_partitions(&mut stream, out, unassigned, &bridge)
                    },
                    |written| Ok(JsPartitionOutput::from(written)),
                )))
            }

            /// Collect the tags reachable from `kmer` into a pre-partition handle.
            #[napi]
            pub fn find_all_tags(&self, kmer: String) -> napi::Result<JsHandleRef> {
                let info = self.with_engine(|e| e.find_all_tags(&kmer))?;
                Ok(runtime::get()?.register(info.map_err(to_napi_error)?))
            }

            #[napi]
            pub fn assign_partition_id(&self, handle: i64) -> napi::Result<u32> {
                let id = handle_id_from_js(handle)?;
                runtime::get()?.with_handles(|registry| {
                    let info = registry.get(id).map_err(to_napi_error)?;
                    self.with_engine(|e| e.assign_partition_id(info))?
                        .map_err(to_napi_error)
                })
            }

            /// Partition the tags in `[start, end)` into a subset handle. An
            /// omitted or zero `end` is unbounded.
            #[napi]
            pub fn do_subset_partition(
                &self,
                start: Option<BigInt>,
                end: Option<BigInt>,
                stop_big_traversals: Option<bool>,
                env: Env,
                observer: JsUnknown,
            ) -> napi::Result<AsyncTask<EngineTask<OpaqueHandle, JsHandleRef>>> {
                let engine = self.shared()?;
                let rt = runtime::get()?;
                let start = start.as_ref().map(hash_from_js).transpose()?.unwrap_or(0);
                let end = end.as_ref().map(hash_from_js).transpose()?.unwrap_or(0);
                let flags = PartitionFlags {
                    stop_big_traversals: stop_big_traversals
                        .unwrap_or_else(|| rt.config.partition.effective_stop_big_traversals()),
                    abundance: None,
                };
                let bridge = rt.bridge(&observer_choice(&env, observer)?);
                Ok(AsyncTask::new(EngineTask::new(
                    move || lock(&engine).do_subset_partition(start, end, flags, &bridge),
                    |subset| Ok(runtime::get()?.register(subset)),
                )))
            }

            #[napi]
            pub fn merge_subset(&self, handle: i64) -> napi::Result<()> {
                let id = handle_id_from_js(handle)?;
                runtime::get()?.with_handles(|registry| {
                    let subset = registry.get(id).map_err(to_napi_error)?;
                    self.with_engine(|e| e.merge_subset(subset))?
                        .map_err(to_napi_error)
                })
            }

            #[napi]
            pub fn merge_subset_from_disk(&self, path: String) -> napi::Result<()> {
                self.with_engine(|e| e.merge_subset_from_disk(Path::new(&path)))?
                    .map_err(to_napi_error)
            }

            #[napi]
            pub fn get_partition_id(&self, kmer: String) -> napi::Result<u32> {
                self.with_engine(|e| e.get_partition_id(&kmer))?
                    .map_err(to_napi_error)
            }

            #[napi]
            pub fn join_partitions(&self, a: u32, b: u32) -> napi::Result<u32> {
                self.with_engine(|e| e.join_partitions(a, b))
            }

            #[napi]
            pub fn count_partitions(&self) -> napi::Result<JsPartitionCounts> {
                self.with_engine(|e| JsPartitionCounts::from(e.count_partitions()))
            }

            #[napi]
            pub fn save(&self, path: String) -> napi::Result<()> {
                self.with_engine(|e| e.save(Path::new(&path)))?
                    .map_err(to_napi_error)
            }

            #[napi]
            pub fn load(&self, path: String) -> napi::Result<()> {
                self.with_engine(|e| e.load(Path::new(&path)))?
                    .map_err(to_napi_error)
            }

            #[napi]
            pub fn save_tagset(&self, path: String) -> napi::Result<()> {
                self.with_engine(|e| e.save_tagset(Path::new(&path)))?
                    .map_err(to_napi_error)
            }

            #[napi]
            pub fn load_tagset(&self, path: String) -> napi::Result<()> {
                self.with_engine(|e| e.load_tagset(Path::new(&path)))?
                    .map_err(to_napi_error)
            }

            #[napi]
            pub fn save_stop_tags(&self, path: String) -> napi::Result<()> {
                self.with_engine(|e| e.save_stop_tags(Path::new(&path)))?
                    .map_err(to_napi_error)
            }

            #[napi]
            pub fn load_stop_tags(&self, path: String) -> napi::Result<()> {
                self.with_engine(|e| e.load_stop_tags(Path::new(&path)))?
                    .map_err(to_napi_error)
            }

            #[napi]
            pub fn save_partitionmap(&self, path: String) -> napi::Result<()> {
                self.with_engine(|e| e.save_partitionmap(Path::new(&path)))?
                    .map_err(to_napi_error)
            }

            #[napi]
            pub fn load_partitionmap(&self, path: String) -> napi::Result<()> {
                self.with_engine(|e| e.load_partitionmap(Path::new(&path)))?
                    .map_err(to_napi_error)
            }

            /// Drop the engine. Later calls fail with `INVALID_HANDLE`; tasks
            /// already running keep their reference until they finish.
            #[napi]
            pub fn release(&mut self) -> napi::Result<()> {
                self.engine.release().map_err(to_napi_error)
            }
        }
    };
}
